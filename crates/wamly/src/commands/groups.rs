//! `wamly groups`: list speaker groups among configured speakers.

use tabled::Tabled;

use wamly_core::{Controller, Group};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Anchor")]
    anchor: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Members")]
    members: String,
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        Self {
            anchor: g.anchor.to_string(),
            token: g.token.clone(),
            members: g
                .members
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    // Unreachable speakers are simply not part of any group.
    util::connect_all(controller, global).await?;
    let groups = controller.groups();

    let out = output::render_list(global.output, &groups, |g| GroupRow::from(g), |g| {
        g.token.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
