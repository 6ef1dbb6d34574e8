pub struct Utils;

impl Utils {
    /// Round to a fixed number of decimal places.
    pub fn round(value: f64, places: i32) -> f64 {
        let factor = 10f64.powi(places);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_places() {
        assert_eq!(Utils::round(3.14159, 2), 3.14);
        assert_eq!(Utils::round(3.14159, 3), 3.142);
        assert_eq!(Utils::round(-1.05, 1), -1.1);
        assert_eq!(Utils::round(150.0, 2), 150.0);
    }
}
