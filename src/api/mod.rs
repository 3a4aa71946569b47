pub mod attendance;
pub mod client;
pub mod employee;
pub mod employee_image;
pub mod filial;
pub mod position;
pub mod user;
pub mod working_graphic;

use serde::Serialize;
use utoipa::ToSchema;

/// `{id, name}` reference to a related record.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NamedRef {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Filial 1")]
    pub name: String,
}

/// Sorted, de-duplicated ids.
pub fn unique_ids(ids: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut ids: Vec<u64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_sorts_and_dedups() {
        assert_eq!(unique_ids([3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(unique_ids([]).is_empty());
    }
}
