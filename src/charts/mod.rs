pub mod history;
pub mod render;
pub mod standings;

use std::collections::HashSet;

/// Championship points awarded per finishing position; anything outside
/// the top fifteen scores nothing.
pub fn points_for_position(position: i64) -> i64 {
    match position {
        1 => 25,
        2 => 20,
        3 => 16,
        4 => 13,
        5 => 11,
        6 => 10,
        7 => 9,
        8 => 8,
        9 => 7,
        10 => 6,
        11 => 5,
        12 => 4,
        13 => 3,
        14 => 2,
        15 => 1,
        _ => 0,
    }
}

/// Session codes in running order for a season's era. 2005 sits in the
/// modern arm: only the surrounding years used the distinct schedules.
pub fn session_order_for(year: i32) -> &'static [&'static str] {
    if year < 2005 {
        &["RAC"]
    } else if (2006..=2008).contains(&year) {
        &["FP1", "QP1", "FP2", "QP2", "QP", "WUP", "RAC"]
    } else {
        &["FP1", "FP2", "FP3", "FP4", "QP", "Q1", "Q2", "WUP", "RAC"]
    }
}

/// Fold a historic class name into its modern successor once the modern
/// class has been observed at the same location, so a track's result
/// history charts as one continuous lineage.
pub fn fold_category_label(name: &str, modern_seen: &mut HashSet<String>) -> String {
    match name {
        "MotoGP" | "Moto2" | "Moto3" => {
            modern_seen.insert(name.to_string());
            name.to_string()
        }
        "500cc" if modern_seen.contains("MotoGP") => "MotoGP".to_string(),
        "250cc" if modern_seen.contains("Moto2") => "Moto2".to_string(),
        "125cc" if modern_seen.contains("Moto3") => "Moto3".to_string(),
        other => other.to_string(),
    }
}
