use anyhow::Result;
use controller::{Client, KindVisitor, Object};

use super::Session;
use crate::Context;
use crate::address::Address;
use crate::engine::lifecycle;
use crate::manifest::Manifest;
use crate::state::State;
use crate::ui;

struct Import<'a> {
    client: &'a Client,
    state: &'a mut State,
    address: &'a Address,
    id: &'a str,
}

impl KindVisitor for Import<'_> {
    type Output = Result<String>;

    fn visit<T: Object>(self) -> Self::Output {
        lifecycle::import::<T>(self.client, self.state, self.address, self.id)
    }
}

pub fn run(ctx: &Context, address: &Address, id: &str) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let entry = address.kind.visit(Import {
        client: &session.client,
        state: &mut session.state,
        address,
        id,
    })?;
    session.save_state()?;

    ui::success(&format!("Imported {} {id} as {address}", address.kind));

    let declared = session.manifest_path.exists()
        && Manifest::load(&session.manifest_path).is_ok_and(|m| m.contains(address));
    if declared {
        ui::dim("Already declared in the manifest; run 'netform plan' to compare.");
    } else {
        println!();
        ui::dim(&format!(
            "Add this to {} to manage it:",
            session.manifest_path.display()
        ));
        println!();
        print!("{entry}");
    }
    Ok(())
}
