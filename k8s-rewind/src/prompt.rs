use std::{
    io::{stdin, IsTerminal},
    num::NonZeroU64,
};

use anyhow::{anyhow, Context};
use dialoguer::{Input, Select};
use k8s_rewind_core::policy::RollbackPolicy;

use crate::cli::parse_change_cause;

const POLICY_CHOICES: [&str; 3] = [
    "previous revision (-1)",
    "next revision (+1)",
    "specific revision",
];

pub fn is_interactive() -> bool {
    stdin().is_terminal()
}

/// Returns `policy` if given, asks for one otherwise. Without a terminal to
/// ask on, a missing policy is an error.
pub fn resolve_policy(
    policy: Option<RollbackPolicy>,
    interactive: bool,
) -> anyhow::Result<RollbackPolicy> {
    if let Some(policy) = policy {
        return Ok(policy);
    }

    if !interactive {
        return Err(anyhow!(
            "Rollback policy wasn't specified! Use --revision to pick '-1' or a revision number."
        ));
    }

    let choice = Select::new()
        .with_prompt("Roll back to")
        .items(&POLICY_CHOICES)
        .default(0)
        .interact()
        .context("Couldn't read the rollback policy!")?;

    policy_from_choice(choice, ask_for_revision)
}

fn ask_for_revision() -> anyhow::Result<NonZeroU64> {
    Input::<NonZeroU64>::new()
        .with_prompt("Revision number")
        .interact_text()
        .context("Couldn't read the revision number!")
}

fn policy_from_choice(
    choice: usize,
    revision: impl FnOnce() -> anyhow::Result<NonZeroU64>,
) -> anyhow::Result<RollbackPolicy> {
    match choice {
        0 => Ok(RollbackPolicy::PreviousRevision),
        1 => Ok(RollbackPolicy::Relative(1)),
        2 => Ok(RollbackPolicy::SpecificRevision(revision()?)),
        _ => Err(anyhow!("Unknown rollback policy selection!")),
    }
}

/// Returns `change_cause` if given, asks for one otherwise.
pub fn resolve_change_cause(
    change_cause: Option<String>,
    interactive: bool,
) -> anyhow::Result<String> {
    if let Some(change_cause) = change_cause {
        return Ok(change_cause);
    }

    if !interactive {
        return Err(anyhow!(
            "Change cause wasn't specified! Use --change-cause to describe the rollback."
        ));
    }

    let change_cause: String = Input::new()
        .with_prompt("Change cause")
        .validate_with(|input: &String| parse_change_cause(input).map(|_| ()))
        .interact_text()
        .context("Couldn't read the change cause!")?;

    parse_change_cause(&change_cause).map_err(|e| anyhow!(e))
}
