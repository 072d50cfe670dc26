// TSNotes state managers
// Managers own long-lived state: the companion window and the queue that
// serializes requests against it.

pub mod companion_window;
pub mod request_queue;
