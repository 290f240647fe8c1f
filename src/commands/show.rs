use anyhow::{Result, bail};
use controller::{Client, KindVisitor, Object};

use super::Session;
use crate::Context;
use crate::address::Address;
use crate::engine::lifecycle;
use crate::manifest;

struct Show<'a> {
    client: &'a Client,
    address: &'a Address,
    id: &'a str,
}

impl KindVisitor for Show<'_> {
    type Output = Result<Option<String>>;

    fn visit<T: Object>(self) -> Self::Output {
        match lifecycle::read::<T>(self.client, self.id)? {
            Some(object) => manifest::render(self.address, &object).map(Some),
            None => Ok(None),
        }
    }
}

pub fn run(ctx: &Context, address: &Address) -> Result<()> {
    let session = Session::open(ctx)?;
    let Some(id) = session.state.id_of(address) else {
        bail!("{address} is not tracked in state (see 'netform import')");
    };

    let rendered = address.kind.visit(Show {
        client: &session.client,
        address,
        id,
    })?;
    match rendered {
        Some(entry) => {
            if ctx.verbose > 0 {
                println!("# {address} ({id})");
            }
            print!("{entry}");
            Ok(())
        }
        None => bail!("{address} ({id}) no longer exists on the controller; run 'netform refresh'"),
    }
}
