//! crates/stream/src/normalize.rs
//!
//! Command-level filtering and DB tagging applied to every array parsed out
//! of the live command stream, ahead of handing it to the sink.

/// What to do with one parsed command array.
pub enum Decision {
    /// Update the logical current database; emit nothing.
    SelectDb(u32),
    /// Drop the command entirely — heartbeat, transaction-boundary, or
    /// sentinel chatter with no state-changing effect worth forwarding.
    Drop,
    /// Forward the command tagged with the current database.
    Forward,
}

/// Classifies a parsed command array by its verb (case-insensitively) and,
/// for `SELECT`, its argument.
///
/// # Panics
///
/// Never — an empty `argv` classifies as [`Decision::Drop`].
#[must_use]
pub fn classify(argv: &[Vec<u8>]) -> Decision {
    let Some(verb) = argv.first() else {
        return Decision::Drop;
    };

    if verb.eq_ignore_ascii_case(b"select") {
        if let Some(db_text) = argv.get(1) {
            if let Ok(db_text) = std::str::from_utf8(db_text) {
                if let Ok(db_id) = db_text.parse::<u32>() {
                    return Decision::SelectDb(db_id);
                }
            }
        }
        return Decision::Drop;
    }

    if verb.eq_ignore_ascii_case(b"ping")
        || verb.eq_ignore_ascii_case(b"replconf")
        || verb.eq_ignore_ascii_case(b"opinfo")
        || verb.eq_ignore_ascii_case(b"multi")
        || verb.eq_ignore_ascii_case(b"exec")
    {
        return Decision::Drop;
    }

    if verb.eq_ignore_ascii_case(b"publish") {
        if let Some(channel) = argv.get(1) {
            if channel.as_slice() == b"__sentinel__:hello" {
                return Decision::Drop;
            }
        }
    }

    Decision::Forward
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<Vec<u8>> {
        words.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn select_updates_db_and_is_dropped() {
        assert!(matches!(classify(&argv(&["SELECT", "3"])), Decision::SelectDb(3)));
        assert!(matches!(classify(&argv(&["select", "7"])), Decision::SelectDb(7)));
    }

    #[test]
    fn heartbeat_and_transaction_commands_are_dropped() {
        for verb in ["PING", "ping", "REPLCONF", "OPINFO", "MULTI", "EXEC"] {
            assert!(matches!(classify(&argv(&[verb])), Decision::Drop), "{verb}");
        }
    }

    #[test]
    fn sentinel_publish_is_dropped() {
        assert!(matches!(
            classify(&argv(&["PUBLISH", "__sentinel__:hello", "payload"])),
            Decision::Drop
        ));
    }

    #[test]
    fn publish_to_other_channels_is_forwarded() {
        assert!(matches!(
            classify(&argv(&["PUBLISH", "news", "payload"])),
            Decision::Forward
        ));
    }

    #[test]
    fn ordinary_command_is_forwarded() {
        assert!(matches!(classify(&argv(&["SET", "k", "v"])), Decision::Forward));
    }

    #[test]
    fn empty_argv_is_dropped() {
        assert!(matches!(classify(&[]), Decision::Drop));
    }

    #[test]
    fn malformed_select_argument_is_dropped_not_forwarded() {
        assert!(matches!(classify(&argv(&["SELECT", "not-a-number"])), Decision::Drop));
    }
}
