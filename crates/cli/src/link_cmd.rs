use anyhow::{Context, Result};
use threadline_core::branch::annotate_branches;
use threadline_core::deep_link::DeepLink;
use threadline_core::Message;

/// Run the `link` command.
pub fn run_link(messages: &[Message], message_id: &str) -> Result<()> {
    println!("{}", link_for(messages, message_id)?);
    Ok(())
}

/// Run the `resolve` command.
pub fn run_resolve(messages: &[Message], query: &str) -> Result<()> {
    let message = resolve_query(messages, query)?;
    crate::output::print_json(&message)
}

fn link_for(messages: &[Message], message_id: &str) -> Result<DeepLink> {
    let annotated = annotate_branches(messages);
    let message = annotated
        .iter()
        .find(|m| m.id == message_id)
        .with_context(|| format!("message {message_id} not found"))?;
    Ok(DeepLink::for_message(message))
}

fn resolve_query(messages: &[Message], query: &str) -> Result<Message> {
    let link = DeepLink::parse(query)?;
    let annotated = annotate_branches(messages);
    let message = link
        .resolve(&annotated)
        .with_context(|| format!("message {} not found", link.message_id))?;
    Ok(message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_core::testing::{assistant, user};

    fn branched() -> Vec<Message> {
        vec![
            user("u1", None, 0),
            assistant("a1", Some("u1"), 1),
            assistant("a2", Some("u1"), 2),
        ]
    }

    #[test]
    fn link_carries_branch_position() {
        let link = link_for(&branched(), "a2").unwrap();
        assert_eq!(link.message_id, "a2");
        assert_eq!(link.branch_index, Some(2));
        assert!(link.to_query_string().contains("branchIndex=2"));
    }

    #[test]
    fn link_round_trips_through_resolve() {
        let msgs = branched();
        let query = link_for(&msgs, "a1").unwrap().to_query_string();
        let resolved = resolve_query(&msgs, &query).unwrap();
        assert_eq!(resolved.id, "a1");
        assert_eq!(resolved.branch.map(|b| b.branch_index), Some(1));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let err = link_for(&branched(), "missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(resolve_query(&branched(), "messageId=missing").is_err());
        assert!(resolve_query(&branched(), "branchIndex=1").is_err());
    }
}
