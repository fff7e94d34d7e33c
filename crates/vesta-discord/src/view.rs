//! Component builders for the cancellation flow messages.

use serenity::builder::{
    CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
};
use serenity::model::application::ButtonStyle;

use vesta_scheduler::Job;

pub const SELECT_ID: &str = "vesta_job_select";
pub const REMOVE_ID: &str = "vesta_job_remove";
pub const CANCEL_ID: &str = "vesta_job_cancel";

/// Discord caps string-select menus at 25 options.
const MAX_OPTIONS: usize = 25;

/// Select menu with one option per job, labelled by name with the
/// frequency/requester line as description.
pub fn job_select_row(jobs: &[Job]) -> CreateActionRow {
    let options = jobs
        .iter()
        .take(MAX_OPTIONS)
        .map(|job| CreateSelectMenuOption::new(job.name.clone(), job.id()).description(job.message()))
        .collect();

    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(SELECT_ID, CreateSelectMenuKind::String { options })
            .placeholder("Select a scheduled job"),
    )
}

/// Remove / Cancel buttons shown while confirming a removal.
pub fn confirm_buttons_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(REMOVE_ID)
            .label("Remove")
            .style(ButtonStyle::Danger),
        CreateButton::new(CANCEL_ID)
            .label("Cancel")
            .style(ButtonStyle::Secondary),
    ])
}
