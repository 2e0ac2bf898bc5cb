//! Parsing of the values returned by the `...?` read commands.

use crate::errors::{Result, TelloError};
use crate::state::{Attitude, TelloState, Vector3};

/// "86" → 86 %
pub fn battery(response: &str) -> Result<u8> {
    number(response)
}

/// "100.0" → 100 cm/s
pub fn speed(response: &str) -> Result<i32> {
    number::<f64>(response).map(|s| s as i32)
}

/// "12s" → 12 s
pub fn flight_time(response: &str) -> Result<i32> {
    number(response)
}

/// "5dm" → 50 cm
pub fn height(response: &str) -> Result<i32> {
    number::<i32>(response).map(|dm| dm * 10)
}

/// "60~62C" → 60 °C, the low end of the range
pub fn temperature(response: &str) -> Result<i32> {
    let low = response.split('~').next().unwrap_or(response);
    number(low)
}

pub fn barometer(response: &str) -> Result<f64> {
    number(response)
}

/// "100mm" → 10.0 cm
pub fn time_of_flight(response: &str) -> Result<f64> {
    number::<f64>(response).map(|mm| mm / 10.0)
}

/// "pitch:0;roll:1;yaw:-90;"
pub fn attitude(response: &str) -> Result<Attitude> {
    TelloState::from_message(response)
        .attitude()
        .ok_or_else(|| TelloError::parse(format!("bad attitude {:?}", response.trim())))
}

/// "agx:-2.00;agy:-4.00;agz:-1000.00;"
pub fn acceleration(response: &str) -> Result<Vector3<f64>> {
    TelloState::from_message(response)
        .acceleration
        .complete()
        .ok_or_else(|| TelloError::parse(format!("bad acceleration {:?}", response.trim())))
}

/// Parses the number in a response, ignoring units and whitespace.
fn number<T: std::str::FromStr>(response: &str) -> Result<T> {
    let digits: String = response
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    digits
        .parse()
        .map_err(|_| TelloError::parse(format!("expected a number, got {:?}", response.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_units() {
        assert_eq!(battery("86\r\n").unwrap(), 86);
        assert_eq!(speed("100.0").unwrap(), 100);
        assert_eq!(flight_time("12s").unwrap(), 12);
        assert_eq!(height("5dm").unwrap(), 50);
        assert_eq!(height("-1dm").unwrap(), -10);
        assert_eq!(temperature("60~62C").unwrap(), 60);
        assert_eq!(temperature("58C").unwrap(), 58);
        assert_eq!(barometer("-57.14").unwrap(), -57.14);
        assert_eq!(time_of_flight("100mm").unwrap(), 10.0);
    }

    #[test]
    fn rejects_responses_without_a_number() {
        assert!(matches!(battery("ok"), Err(TelloError::ParseError { .. })));
        assert!(battery("").is_err());
        assert!(battery("300").is_err());
    }

    #[test]
    fn reads_attitude_and_acceleration() {
        assert_eq!(attitude("pitch:0;roll:1;yaw:-90;\r\n").unwrap(), Attitude { pitch: 0, roll: 1, yaw: -90 });
        assert_eq!(
            acceleration("agx:-2.00;agy:-4.00;agz:-1000.00;").unwrap(),
            Vector3 { x: -2.0, y: -4.0, z: -1000.0 }
        );
        assert!(attitude("pitch:0;roll:1").is_err());
    }
}
