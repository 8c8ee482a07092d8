/// The universal output unit produced by both the snapshot decoder and the
/// live command-stream parser: a single command tagged with the logical
/// database it applies to.
///
/// Deliberately minimal — command name, key positions, and hash slots are
/// derived downstream by the sink and do not belong here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// The `SELECT`-ed database this command applies to.
    pub db_id: u32,
    /// The command and its arguments, in wire order.
    pub argv: Vec<Vec<u8>>,
}

impl Entry {
    /// Builds an entry from a db id and an `argv` built from borrowed byte
    /// slices, copying each argument.
    #[must_use]
    pub fn new(db_id: u32, argv: &[&[u8]]) -> Self {
        Self {
            db_id,
            argv: argv.iter().map(|arg| arg.to_vec()).collect(),
        }
    }
}
