mod bookings;
mod categories;
mod items;
mod users;

use rocket::Route;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 100;

/// Normalizes `skip`/`limit` query parameters.
pub(crate) fn paging(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);
    (skip, limit)
}

/// Every API route, to be mounted under `/api`.
pub fn all() -> Vec<Route> {
    let mut routes = users::routes();
    routes.extend(categories::routes());
    routes.extend(items::routes());
    routes.extend(bookings::routes());
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(paging(None, None), (0, 100));
        assert_eq!(paging(Some(-3), Some(500)), (0, 100));
        assert_eq!(paging(Some(20), Some(5)), (20, 5));
    }
}
