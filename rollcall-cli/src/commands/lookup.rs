//! Lookup commands - resolve an identifier against the user store
//!
//! `lookup` (filtered), `probe` (quick) and `matches` (all) share this path.
//! Only the command, strategy and outcome are logged, never the identifier.

use std::collections::HashMap;

use anyhow::Result;
use rollcall_core::services::{LookupPlan, ResolveService, ResolveStrategy};
use rollcall_core::{LogEvent, OperationResult, UserRecord};

use super::{error_kind, get_config, get_context, get_logger, log_event};
use crate::output;

fn command_name(strategy: ResolveStrategy) -> &'static str {
    match strategy {
        ResolveStrategy::Filtered => "lookup",
        ResolveStrategy::Quick => "probe",
        ResolveStrategy::All => "matches",
    }
}

fn outcome_label(match_count: usize) -> &'static str {
    match match_count {
        0 => "no_match",
        1 => "match",
        _ => "ambiguous",
    }
}

pub fn run(
    db: Option<String>,
    identifier: &str,
    strategy: ResolveStrategy,
    explain: bool,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    let command = command_name(strategy);
    let event = |name: &str| {
        LogEvent::new(name)
            .with_command(command)
            .with_strategy(strategy.as_str())
    };

    log_event(&logger, event("command_executed"));

    let (plan, matches) = match resolve(db, identifier, strategy) {
        Ok(result) => result,
        Err(e) => {
            log_event(&logger, event(&format!("{}_failed", command)).with_error(error_kind(&e)));
            return Err(e);
        }
    };

    log_event(
        &logger,
        event(&format!("{}_completed", command)).with_outcome(outcome_label(matches.len())),
    );
    if matches.len() > 1 {
        log_event(&logger, event("ambiguous_match").with_outcome(matches.len().to_string()));
    }

    if json {
        return print_json(&plan, &matches, strategy, explain);
    }

    if explain {
        println!("{}", output::plan_table(&plan.candidates, &plan.predicates));
        println!();
    }

    match strategy {
        ResolveStrategy::All => print_all(&matches),
        _ => print_first(&matches, strategy),
    }

    Ok(())
}

/// Validate, then open the store and run the strategy
fn resolve(
    db: Option<String>,
    identifier: &str,
    strategy: ResolveStrategy,
) -> Result<(LookupPlan, Vec<UserRecord>)> {
    let plan = LookupPlan::for_identifier(identifier)?;
    let ctx = get_context(get_config(db)?)?;
    let matches = run_strategy(&ctx.resolve_service, &plan, strategy)?;
    Ok((plan, matches))
}

/// Only `matches` reads every active match; the single-user strategies stop at the first
fn run_strategy(
    service: &ResolveService,
    plan: &LookupPlan,
    strategy: ResolveStrategy,
) -> rollcall_core::Result<Vec<UserRecord>> {
    Ok(match strategy {
        ResolveStrategy::Filtered => service.resolve(&plan.predicates)?.into_iter().collect(),
        ResolveStrategy::Quick => service.resolve_quick(&plan.candidates)?.into_iter().collect(),
        ResolveStrategy::All => service.resolve_all(&plan.predicates)?,
    })
}

fn print_json(
    plan: &LookupPlan,
    matches: &[UserRecord],
    strategy: ResolveStrategy,
    explain: bool,
) -> Result<()> {
    let mut context = HashMap::new();
    context.insert("strategy".to_string(), serde_json::json!(strategy.as_str()));
    context.insert("matchCount".to_string(), serde_json::json!(matches.len()));
    if explain {
        context.insert("plan".to_string(), serde_json::to_value(plan)?);
    }

    let rendered = match strategy {
        ResolveStrategy::All => {
            serde_json::to_string_pretty(&OperationResult::ok_with_context(matches, context))?
        }
        _ => serde_json::to_string_pretty(&OperationResult::ok_with_context(
            matches.first(),
            context,
        ))?,
    };
    println!("{}", rendered);
    Ok(())
}

fn print_first(matches: &[UserRecord], strategy: ResolveStrategy) {
    let Some(user) = matches.first() else {
        output::warning("No match");
        return;
    };

    println!("{}", output::user_detail(user));

    if strategy == ResolveStrategy::Quick && !user.is_active() {
        output::warning("This user is inactive; `lookup` would not return it.");
    }
}

fn print_all(matches: &[UserRecord]) {
    if matches.is_empty() {
        output::warning("No match");
        return;
    }

    println!("{}", output::user_table(matches));

    if matches.len() > 1 {
        output::warning(&format!(
            "Identifier is ambiguous: {} active users match.",
            matches.len()
        ));
    } else {
        output::success("Exactly one active user matches.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rollcall_core::adapters::duckdb::DuckDbRepository;
    use rollcall_core::{PhoneValue, UserStore};

    fn shared_phone_service() -> ResolveService {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        for email in ["first@x.com", "second@x.com"] {
            repo.insert(&UserRecord::new(email).with_phone(PhoneValue::Text("5557770000".into())))
                .unwrap();
        }
        ResolveService::new(Arc::new(repo))
    }

    #[test]
    fn test_single_user_strategies_return_first_match_only() {
        let service = shared_phone_service();
        let plan = LookupPlan::for_identifier("555-777-0000").unwrap();

        for strategy in [ResolveStrategy::Filtered, ResolveStrategy::Quick] {
            let found = run_strategy(&service, &plan, strategy).unwrap();
            let emails: Vec<_> = found.iter().map(|u| u.email.as_str()).collect();
            assert_eq!(emails, vec!["first@x.com"], "{:?}", strategy);
        }

        let all = run_strategy(&service, &plan, ResolveStrategy::All).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(command_name(ResolveStrategy::Filtered), "lookup");
        assert_eq!(command_name(ResolveStrategy::Quick), "probe");
        assert_eq!(command_name(ResolveStrategy::All), "matches");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(0), "no_match");
        assert_eq!(outcome_label(1), "match");
        assert_eq!(outcome_label(3), "ambiguous");
    }
}
