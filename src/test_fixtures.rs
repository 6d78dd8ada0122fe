//! Builders for fixed-width CIF lines used across unit tests.

/// Places each text at its 1-indexed column in an 80 column record.
pub fn fixed(parts: &[(usize, &str)]) -> String {
    let mut line = vec![b' '; 80];
    for (start, text) in parts {
        let begin = start - 1;
        line[begin..begin + text.len()].copy_from_slice(text.as_bytes());
    }
    String::from_utf8(line).unwrap().trim_end().to_string()
}

pub fn qs(
    operator: &str,
    journey: &str,
    days: &str,
    route: &str,
    direction: char,
    vehicle_type: &str,
) -> String {
    let direction = direction.to_string();
    fixed(&[
        (1, "QSN"),
        (4, operator),
        (8, journey),
        (14, "20200106"),
        (22, "99999999"),
        (30, days),
        (37, "S"),
        (38, "0"),
        (39, route),
        (43, "RB1"),
        (49, vehicle_type),
        (57, "REG123"),
        (65, &direction),
    ])
}

pub fn qo(location: &str, departure: &str) -> String {
    fixed(&[(1, "QO"), (3, location), (15, departure), (19, "A1"), (22, "T1"), (24, "F1")])
}

pub fn qi(location: &str, arrival: &str, departure: &str) -> String {
    fixed(&[
        (1, "QI"),
        (3, location),
        (15, arrival),
        (19, departure),
        (23, "B"),
        (24, "B2"),
        (27, "T0"),
        (29, "F0"),
    ])
}

pub fn qt(location: &str, arrival: &str) -> String {
    fixed(&[(1, "QT"), (3, location), (15, arrival), (19, "C3"), (22, "T1"), (24, "F1")])
}

pub fn bs(uid: &str, days: &str, status: &str, category: &str, identity: &str, class: &str) -> String {
    fixed(&[
        (1, "BSN"),
        (4, uid),
        (10, "200517"),
        (16, "201212"),
        (22, days),
        (30, status),
        (31, category),
        (33, identity),
        (42, "HA123400"),
        (51, "EMU"),
        (58, "100"),
        (67, class),
        (80, "P"),
    ])
}

pub fn lo(location: &str, scheduled_departure: &str, public_departure: &str) -> String {
    fixed(&[
        (1, "LO"),
        (3, location),
        (11, scheduled_departure),
        (16, public_departure),
        (20, "1"),
        (30, "TB"),
    ])
}

pub fn li(
    location: &str,
    scheduled_arrival: &str,
    scheduled_departure: &str,
    scheduled_pass: &str,
    public_arrival: &str,
    public_departure: &str,
) -> String {
    fixed(&[
        (1, "LI"),
        (3, location),
        (11, scheduled_arrival),
        (16, scheduled_departure),
        (21, scheduled_pass),
        (26, public_arrival),
        (30, public_departure),
        (34, "2"),
        (43, "T"),
    ])
}

pub fn lt(location: &str, scheduled_arrival: &str, public_arrival: &str) -> String {
    fixed(&[
        (1, "LT"),
        (3, location),
        (11, scheduled_arrival),
        (16, public_arrival),
        (20, "3"),
        (26, "TF"),
    ])
}
