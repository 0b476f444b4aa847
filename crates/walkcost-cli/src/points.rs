//! Start and stop point lists.
//!
//! One point per line as `east,north` or `east,north,id`. Blank lines and
//! lines starting with `#` are skipped. Points without an id are numbered
//! from 1 in file order.

use std::io::BufRead;

use walkcost_paths::SeedPoint;

use crate::error::ParseError;

pub fn read_points<R: BufRead>(input: R) -> Result<Vec<SeedPoint>, ParseError> {
    let mut points = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<f64> = line
            .split(',')
            .map(|f| f.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseError::syntax(i + 1, format!("invalid point {line:?}")))?;
        let id = (points.len() + 1) as f64;
        let point = match fields[..] {
            [east, north] => SeedPoint::new(east, north, id),
            [east, north, id] => SeedPoint::new(east, north, id),
            _ => {
                return Err(ParseError::syntax(
                    i + 1,
                    format!("expected east,north[,id], got {line:?}"),
                ));
            }
        };
        points.push(point);
    }
    Ok(points)
}

/// `--coordinate` values as points numbered from 1.
pub fn from_coordinates(coords: &[(f64, f64)]) -> Vec<SeedPoint> {
    coords
        .iter()
        .enumerate()
        .map(|(i, &(east, north))| SeedPoint::new(east, north, (i + 1) as f64))
        .collect()
}

/// Parse an `E,N` pair.
pub fn parse_coordinate(s: &str) -> Result<(f64, f64), String> {
    let (e, n) = s
        .split_once(',')
        .ok_or_else(|| format!("expected E,N, got {s:?}"))?;
    let num = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid coordinate {v:?}"))
    };
    Ok((num(e)?, num(n)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_points_with_and_without_ids() {
        let text = "# start points\n10,20\n\n 30.5 , 40 , 7\n50,60\n";
        let pts = read_points(text.as_bytes()).unwrap();
        assert_eq!(
            pts,
            vec![
                SeedPoint::new(10.0, 20.0, 1.0),
                SeedPoint::new(30.5, 40.0, 7.0),
                SeedPoint::new(50.0, 60.0, 3.0),
            ]
        );
    }

    #[test]
    fn bad_lines_report_their_number() {
        assert!(matches!(
            read_points("1,2\n3\n".as_bytes()),
            Err(ParseError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            read_points("1,2,3,4\n".as_bytes()),
            Err(ParseError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            read_points("a,b\n".as_bytes()),
            Err(ParseError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn coordinates() {
        assert_eq!(parse_coordinate("1.5, -2"), Ok((1.5, -2.0)));
        assert!(parse_coordinate("1.5").is_err());
        assert!(parse_coordinate("x,2").is_err());
        assert_eq!(
            from_coordinates(&[(1.0, 2.0), (3.0, 4.0)]),
            vec![SeedPoint::new(1.0, 2.0, 1.0), SeedPoint::new(3.0, 4.0, 2.0)]
        );
    }
}
