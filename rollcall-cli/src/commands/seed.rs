//! Seed-admin command - create or update an administrator account
//!
//! Values come from, lowest precedence first: settings.json defaults,
//! ADMIN_* environment variables, flags, then `key=value` arguments.
//! The password is prompted for when none was supplied.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::Password;
use rollcall_core::services::AdminSeed;
use rollcall_core::{LogEvent, LoggingService};

use super::{error_kind, get_config, get_context, get_logger, log_event};
use crate::output;

#[derive(Args)]
pub struct SeedArgs {
    /// Overrides as key=value (email, password, phone, name, role, assignment)
    #[arg(value_name = "KEY=VALUE")]
    pairs: Vec<String>,

    #[arg(long, env = "ADMIN_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "ADMIN_PHONE")]
    phone: Option<String>,

    #[arg(long, env = "ADMIN_NAME")]
    name: Option<String>,

    #[arg(long, env = "ADMIN_ROLE")]
    role: Option<String>,

    #[arg(long, env = "ADMIN_ASSIGNMENT")]
    assignment: Option<i64>,

    /// Leave an existing password as it is instead of prompting for one
    #[arg(long)]
    keep_password: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl SeedArgs {
    /// Flags first, then key=value pairs on top
    fn into_seed(self) -> Result<(AdminSeed, bool, bool)> {
        let mut seed = AdminSeed {
            email: self.email,
            password: self.password,
            phone: self.phone,
            name: self.name,
            role: self.role,
            assignment: self.assignment,
        };

        for pair in &self.pairs {
            apply_pair(&mut seed, pair)?;
        }

        Ok((seed, self.keep_password, self.json))
    }
}

fn apply_pair(seed: &mut AdminSeed, pair: &str) -> Result<()> {
    let Some((key, value)) = pair.split_once('=') else {
        bail!("Expected key=value, got '{}'", pair);
    };

    let value = value.to_string();
    match key.trim().to_lowercase().as_str() {
        "email" => seed.email = Some(value),
        "password" => seed.password = Some(value),
        "phone" => seed.phone = Some(value),
        "name" => seed.name = Some(value),
        "role" => seed.role = Some(value),
        "assignment" => {
            let n = value
                .trim()
                .parse::<i64>()
                .with_context(|| format!("assignment must be an integer, got '{}'", value))?;
            seed.assignment = Some(n);
        }
        other => bail!(
            "Unknown key '{}' (expected email, password, phone, name, role or assignment)",
            other
        ),
    }
    Ok(())
}

pub fn run(db: Option<String>, args: SeedArgs) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("seed-admin"));

    match seed(db, args, &logger) {
        Ok(()) => Ok(()),
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("seed_failed")
                    .with_command("seed-admin")
                    .with_error(error_kind(&e)),
            );
            Err(e)
        }
    }
}

fn seed(db: Option<String>, args: SeedArgs, logger: &Option<LoggingService>) -> Result<()> {
    let (mut seed, keep_password, json) = args.into_seed()?;

    let config = get_config(db)?;
    let defaults = config.admin.clone();
    if seed.clone().with_defaults(&defaults).email.is_none() {
        bail!(rollcall_core::Error::usage(
            "admin email is required (--email, ADMIN_EMAIL, email=... or settings.json)"
        ));
    }

    let ctx = get_context(config)?;

    let has_password = seed.password.as_deref().is_some_and(|p| !p.is_empty());
    if !has_password && !keep_password {
        let password = Password::new()
            .with_prompt("Admin password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?;
        seed.password = Some(password);
    }

    let user = ctx.upsert_service.seed_admin(seed, &defaults)?;
    let outcome = if user.created_at == user.updated_at {
        "created"
    } else {
        "updated"
    };

    log_event(
        logger,
        LogEvent::new("seed_completed")
            .with_command("seed-admin")
            .with_outcome(outcome),
    );

    if json {
        let result = rollcall_core::OperationResult::ok(&user);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::success(&format!("Admin account {}: {}", outcome, user.email.bold()));
    println!("{}", output::user_detail(&user));
    Ok(())
}
