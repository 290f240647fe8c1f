use anyhow::Result;
use controller::{Client, KindVisitor, Object};

use super::Session;
use crate::Context;
use crate::engine::lifecycle;
use crate::progress;
use crate::ui;

struct Exists<'a> {
    client: &'a Client,
    id: &'a str,
}

impl KindVisitor for Exists<'_> {
    type Output = Result<bool>;

    fn visit<T: Object>(self) -> Self::Output {
        Ok(lifecycle::read::<T>(self.client, self.id)?.is_some())
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let tracked: Vec<_> = session
        .state
        .resources
        .iter()
        .map(|(address, resource)| (address.clone(), resource.id.clone()))
        .collect();

    let pb = progress::bar(tracked.len() as u64, "Refreshing");
    let mut gone = Vec::new();
    for (address, id) in &tracked {
        pb.set_message(address.to_string());
        let exists = address.kind.visit(Exists {
            client: &session.client,
            id,
        })?;
        if !exists {
            gone.push(address.clone());
        }
        pb.inc(1);
    }
    progress::finish_clear(&pb);

    for address in &gone {
        session.state.forget(address);
        ui::warn(&format!("{address} was deleted on the controller; no longer tracked"));
    }
    session.save_state()?;

    ui::success(&format!(
        "Refreshed {} tracked objects ({} removed from state)",
        tracked.len(),
        gone.len()
    ));
    Ok(())
}
