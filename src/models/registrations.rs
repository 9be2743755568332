use crate::schema::registrations;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

/// A link between a phone number and a tour. At most one row exists per
/// (tour_id, phone_number) pair; the composite primary key backs the
/// conditional insert in the registration workflow. Rows are never mutated
/// or deleted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub tour_id: String,
    pub phone_number: String,
    /// Write timestamp, Unix seconds.
    pub create_at: i64,
    /// Copy of the tour's start date at registration time, so "my tours"
    /// listings sort without a join.
    pub start_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_wire_field_names() {
        let registration = Registration {
            tour_id: "hue-001".to_string(),
            phone_number: "0900000000".to_string(),
            create_at: 1_750_000_000,
            start_date: 1_750_100_000,
        };
        let value = serde_json::to_value(&registration).unwrap();
        assert_eq!(value["tourId"], "hue-001");
        assert_eq!(value["phoneNumber"], "0900000000");
        assert_eq!(value["createAt"], 1_750_000_000i64);
        assert_eq!(value["startDate"], 1_750_100_000i64);
    }
}
