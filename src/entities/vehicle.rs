// Vehicle Entity
// Natural key: VIN.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vehicle {
    #[serde(rename = "VIN")]
    pub vin: String,

    /// Sedan, Motorcycle, Semi, ...
    #[serde(rename = "Type")]
    pub vehicle_type: String,

    pub year: i32,
    pub make: String,
    pub model: String,
    pub color: String,
}

impl Vehicle {
    pub const VIN_FIELD: &'static str = "VIN";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_wire_format() {
        let body = r#"{"VIN":"1N4AL11D75C109151","Type":"Sedan","Year":2011,
                       "Make":"Audi","Model":"A5","Color":"Silver"}"#;
        let vehicle: Vehicle = serde_json::from_str(body).unwrap();

        assert_eq!(vehicle.vin, "1N4AL11D75C109151");
        assert_eq!(vehicle.vehicle_type, "Sedan");
        assert_eq!(vehicle.year, 2011);

        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["VIN"], "1N4AL11D75C109151");
        assert_eq!(json["Type"], "Sedan");
    }

    #[test]
    fn test_vehicle_requires_vin() {
        let body = r#"{"Type":"Sedan","Year":2011,"Make":"Audi","Model":"A5","Color":"Silver"}"#;
        assert!(serde_json::from_str::<Vehicle>(body).is_err());
    }
}
