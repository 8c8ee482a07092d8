/// One reconstruction command: an `argv` array of byte-string arguments.
///
/// Value decoders never emit `Entry`s directly — the decoder loop owns
/// `now_db_id` and wraps each `Command` with it before handing it to the
/// caller's channel.
pub type Command = Vec<Vec<u8>>;

pub(crate) fn command(args: &[&[u8]]) -> Command {
    args.iter().map(|arg| arg.to_vec()).collect()
}

pub(crate) fn command_owned(args: Vec<Vec<u8>>) -> Command {
    args
}
