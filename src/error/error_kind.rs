/// Describes Toolvault specific error types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Error caused by the error on the client side.
    ClientError,
    /// Error caused by the lack of privileges to perform an action.
    AccessForbidden,
    /// The requested entity doesn't exist.
    NotFound,
    /// The entity being created already exists.
    Conflict,
    /// Unknown error.
    Unknown,
}
