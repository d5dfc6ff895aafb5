use crate::api::models::RegisterData;
use crate::query::{MutationRequest, QueryBinding, QueryKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login { username: String, password: String },
    Register(RegisterData),
    /// Replace the running pollers with those of the visible screen
    Poll(Vec<QueryBinding>),
    Fetch(QueryKey),
    Mutate(MutationRequest),
    Export { feedback_id: u64 },
    Quit,
}
