use anyhow::{Context, bail};
use serde::Serialize;
use tally_core::{AuditEvent, DispatchMode, ValueMap};
use tally_worker::{DispatchOutcome, Dispatcher};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{EmitArgs, EmitKind};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct EmitResponse {
    /// `None` when the update carried no audited change.
    id: Option<String>,
    mode: DispatchMode,
    outcome: Option<DispatchOutcome>,
}

/// Handle `tally emit`.
pub async fn handle(args: &EmitArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mode = ctx.config.dispatch.mode;
    let Some(event) = build_event(args)? else {
        tracing::info!(
            subject_type = %args.subject_type,
            subject_id = %args.subject_id,
            "no audited change, nothing dispatched"
        );
        return output(
            &EmitResponse {
                id: None,
                mode,
                outcome: None,
            },
            flags.format,
        );
    };

    let dispatcher = Dispatcher::new(mode, &ctx.queue, &ctx.db);
    let outcome = dispatcher.push(&event).await;
    output(
        &EmitResponse {
            id: Some(event.id),
            mode,
            outcome: Some(outcome),
        },
        flags.format,
    )
}

fn build_event(args: &EmitArgs) -> anyhow::Result<Option<AuditEvent>> {
    let subject_type = args.subject_type.as_str();
    let subject_id = args.subject_id.as_str();

    let event = match args.kind {
        EmitKind::Created => Some(AuditEvent::created(
            subject_type,
            subject_id,
            &attributes(args.after.as_deref(), "--after")?,
        )),
        EmitKind::Updated => AuditEvent::updated(
            subject_type,
            subject_id,
            &attributes(args.before.as_deref(), "--before")?,
            &attributes(args.after.as_deref(), "--after")?,
        ),
        EmitKind::Deleted => Some(AuditEvent::deleted(
            subject_type,
            subject_id,
            &attributes(args.before.as_deref(), "--before")?,
        )),
    };

    Ok(match (event, &args.actor) {
        (Some(event), Some(actor)) => Some(event.with_actor(actor.as_str())),
        (event, _) => event,
    })
}

/// Parse a JSON object flag. A missing flag is an empty attribute set.
fn attributes(raw: Option<&str>, flag: &str) -> anyhow::Result<ValueMap> {
    let Some(raw) = raw else {
        return Ok(ValueMap::new());
    };
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .with_context(|| format!("{flag} is not valid JSON"))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("{flag} must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tally_core::EventKind;

    fn args(kind: EmitKind, before: Option<&str>, after: Option<&str>) -> EmitArgs {
        EmitArgs {
            kind,
            subject_type: "User".into(),
            subject_id: "7".into(),
            before: before.map(str::to_string),
            after: after.map(str::to_string),
            actor: Some("42".into()),
        }
    }

    #[test]
    fn created_uses_after_attributes() {
        let event = build_event(&args(EmitKind::Created, None, Some(r#"{"name":"n"}"#)))
            .unwrap()
            .unwrap();
        assert_eq!(event.event, EventKind::Created);
        assert_eq!(event.new_values["name"], "n");
        assert_eq!(event.actor_id.as_deref(), Some("42"));
    }

    #[test]
    fn noop_update_builds_nothing() {
        let same = r#"{"name":"n","updated_at":"2026-01-01 00:00:00"}"#;
        let changed_stamp = r#"{"name":"n","updated_at":"2026-01-01 00:00:01"}"#;
        assert!(
            build_event(&args(EmitKind::Updated, Some(same), Some(changed_stamp)))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn deleted_uses_before_attributes() {
        let event = build_event(&args(EmitKind::Deleted, Some(r#"{"name":"n"}"#), None))
            .unwrap()
            .unwrap();
        assert!(event.new_values.is_empty());
        assert_eq!(event.old_values["name"], "n");
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = build_event(&args(EmitKind::Created, None, Some("[1,2]"))).unwrap_err();
        assert!(err.to_string().contains("--after must be a JSON object"), "{err}");

        let err = build_event(&args(EmitKind::Created, None, Some("{oops"))).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "{err}");
    }
}
