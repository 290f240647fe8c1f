use anyhow::Result;
use colored::Colorize;
use controller::{Kind, KindVisitor, Object};
use reconcile::{FieldRule, FieldSpec};

use crate::ui;

struct Fields;

impl KindVisitor for Fields {
    type Output = &'static [FieldSpec];

    fn visit<T: Object>(self) -> Self::Output {
        T::FIELDS
    }
}

pub fn run(kind: Option<Kind>) -> Result<()> {
    let kinds = kind.map_or_else(|| Kind::all().to_vec(), |kind| vec![kind]);

    for kind in kinds {
        ui::section(&format!("[{kind}.<name>]"));
        ui::dim(&format!("collection: {} ({:?} API)", kind.segment(), kind.flavor()));
        let references: Vec<_> = Kind::all()
            .iter()
            .filter(|other| kind.may_reference(**other))
            .map(ToString::to_string)
            .collect();
        if !references.is_empty() {
            ui::dim(&format!("may reference: {}", references.join(", ")));
        }
        println!();

        for spec in kind.visit(Fields) {
            let rule = match spec.rule {
                FieldRule::Protected => "protected (from controller)".dimmed(),
                FieldRule::Explicit => "explicit (zero/empty is written)".yellow(),
                FieldRule::Default => "".normal(),
            };
            println!("  {:<20} {:<11} {}", spec.name, spec.kind.to_string(), rule);
        }
    }

    println!();
    ui::dim("Fields not declared in the manifest keep their value on the controller.");
    Ok(())
}
