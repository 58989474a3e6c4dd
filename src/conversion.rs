use crate::constants::Degree;

/// Split a sexagesimal field on colons and/or whitespace.
fn sexagesimal_parts(field: &str) -> Vec<&str> {
    field
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a right ascension string to degrees
///
/// Arguments
/// ---------
/// * `ra`: a string representing the right ascension in the format `HH:MM:SS.SS`
///   (colons or whitespace are accepted as separators)
///
/// Returns
/// -------
/// * `Option<Degree>`: the right ascension in degrees, or `None` if the input format is
///   invalid or out of range.
pub fn parse_ra_to_deg(ra: &str) -> Option<Degree> {
    let parts = sexagesimal_parts(ra);
    if parts.len() != 3 {
        return None;
    }

    let h: f64 = parts[0].parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;
    if !(0.0..24.0).contains(&h) || !(0.0..60.0).contains(&m) || !(0.0..60.0).contains(&s) {
        return None;
    }

    Some((h + m / 60.0 + s / 3600.0) * 15.0)
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: a string representing the declination in the format `±DD:MM:SS.SS`
///   (colons or whitespace are accepted as separators)
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, or `None` if the input format is invalid
///   or outside `[-90, 90]`.
pub fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let parts = sexagesimal_parts(dec);
    if parts.len() != 3 {
        return None;
    }

    // the sign is carried by the degree field, "-00" must stay negative
    let sign = if parts[0].starts_with('-') { -1.0 } else { 1.0 };
    let d: f64 = parts[0].trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;
    if !(0.0..60.0).contains(&m) || !(0.0..60.0).contains(&s) {
        return None;
    }

    let dec_deg = sign * (d + m / 60.0 + s / 3600.0);
    if dec_deg.abs() > 90.0 {
        return None;
    }
    Some(dec_deg)
}
