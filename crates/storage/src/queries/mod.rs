use mobility::store::StoreError;

pub mod document;

pub(crate) fn convert_error(why: sqlx::Error) -> StoreError {
    StoreError::other(why)
}
