//! SVG outline loading
//!
//! Reads the first drawn `<path>`, `<polygon>`, `<polyline>`, `<rect>`,
//! `<circle>` or `<ellipse>` of a document and turns its first subpath into a
//! [`Wire2D`]. Comments, CDATA and anything inside `<defs>` are skipped.
//! `transform` attributes of the element and its groups are applied; the
//! root `viewBox` is not. Curves and arcs are flattened. The SVG Y axis
//! points down, so Y is negated to get a right-handed profile.

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::iter::Peekable;
use std::path::Path;
use std::vec::IntoIter;

use glam::{Affine2, Mat2, Vec2};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ProfileError, Wire2D};

/// Segments used to flatten each Bezier curve
const CURVE_SEGMENTS: usize = 16;

/// Segments used for a full turn of a circle, ellipse or arc
const ELLIPSE_SEGMENTS: usize = 64;

/// Elements whose children are never drawn directly
const HIDDEN_CONTAINERS: [&[u8]; 6] = [
    b"defs",
    b"clipPath",
    b"mask",
    b"symbol",
    b"pattern",
    b"marker",
];

/// Load a profile from an SVG file
pub fn load_profile(path: impl AsRef<Path>) -> Result<Wire2D, ProfileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ProfileError::Io(format!("{}: {}", path.display(), e)))?;
    parse_profile(&text)
}

/// Parse a profile from SVG document text
pub fn parse_profile(text: &str) -> Result<Wire2D, ProfileError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => match visit(&element, open.last())? {
                Visit::Outline(profile) => return Ok(profile),
                Visit::Enter(frame) => open.push(frame),
            },
            Ok(Event::Empty(element)) => {
                if let Visit::Outline(profile) = visit(&element, open.last())? {
                    return Ok(profile);
                }
            }
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProfileError::Svg(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Err(ProfileError::Svg("no drawable outline element found".into()))
}

/// Transform and visibility in effect inside an open element
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    transform: Affine2,
    hidden: bool,
}

enum Visit {
    Outline(Wire2D),
    Enter(Frame),
}

fn visit(element: &BytesStart<'_>, parent: Option<&Frame>) -> Result<Visit, ProfileError> {
    let parent = parent.copied().unwrap_or_default();
    let name = element.local_name();
    let attributes = attributes(element)?;

    let transform = match attributes.get("transform") {
        Some(text) => parent.transform * parse_transform(text)?,
        None => parent.transform,
    };
    let hidden = parent.hidden || HIDDEN_CONTAINERS.contains(&name.as_ref());
    if !hidden {
        if let Some(points) = outline(name.as_ref(), &attributes)? {
            return to_profile(points, transform).map(Visit::Outline);
        }
    }
    Ok(Visit::Enter(Frame { transform, hidden }))
}

/// Apply the element transform, flip Y and orient counter-clockwise
fn to_profile(points: Vec<Vec2>, transform: Affine2) -> Result<Wire2D, ProfileError> {
    let wire = Wire2D::new(
        points
            .into_iter()
            .map(|p| transform.transform_point2(p) * Vec2::new(1.0, -1.0))
            .collect(),
    );
    wire.validate()?;
    Ok(wire.to_ccw())
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, ProfileError> {
    let mut map = HashMap::new();
    for attr in element.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ProfileError::Svg(format!("attribute {}: {}", key, e)))?;
        map.insert(key, value.into_owned());
    }
    Ok(map)
}

/// Outline points of a drawable element, or `None` for other elements
fn outline(
    name: &[u8],
    attributes: &HashMap<String, String>,
) -> Result<Option<Vec<Vec2>>, ProfileError> {
    let points = match name {
        b"path" => {
            let d = attributes
                .get("d")
                .ok_or_else(|| ProfileError::Svg("<path> without a d attribute".into()))?;
            parse_path_data(d)?
        }
        b"polygon" | b"polyline" => {
            let points = attributes.get("points").ok_or_else(|| {
                ProfileError::Svg("<polygon> without a points attribute".into())
            })?;
            parse_points(points)?
        }
        b"rect" => {
            let corner = Vec2::new(
                length(attributes, "x", Some(0.0))?,
                length(attributes, "y", Some(0.0))?,
            );
            let size = Vec2::new(
                length(attributes, "width", None)?,
                length(attributes, "height", None)?,
            );
            vec![
                corner,
                corner + Vec2::new(size.x, 0.0),
                corner + size,
                corner + Vec2::new(0.0, size.y),
            ]
        }
        b"circle" | b"ellipse" => {
            let center = Vec2::new(
                length(attributes, "cx", Some(0.0))?,
                length(attributes, "cy", Some(0.0))?,
            );
            let radii = if name == b"circle" {
                Vec2::splat(length(attributes, "r", None)?)
            } else {
                Vec2::new(length(attributes, "rx", None)?, length(attributes, "ry", None)?)
            };
            (0..ELLIPSE_SEGMENTS)
                .map(|i| {
                    let t = i as f32 / ELLIPSE_SEGMENTS as f32 * TAU;
                    center + radii * Vec2::new(t.cos(), t.sin())
                })
                .collect()
        }
        _ => return Ok(None),
    };
    Ok(Some(points))
}

/// A numeric attribute in user units
fn length(
    attributes: &HashMap<String, String>,
    name: &str,
    default: Option<f32>,
) -> Result<f32, ProfileError> {
    match (attributes.get(name), default) {
        (Some(value), _) => value
            .trim()
            .trim_end_matches("px")
            .parse()
            .map_err(|_| ProfileError::Svg(format!("invalid {} '{}'", name, value))),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(ProfileError::Svg(format!("missing {} attribute", name))),
    }
}

fn parse_points(text: &str) -> Result<Vec<Vec2>, ProfileError> {
    let numbers = Tokenizer::new(text).numbers()?;
    if numbers.len() % 2 != 0 {
        return Err(ProfileError::Svg("odd number of polygon coordinates".into()));
    }
    Ok(numbers
        .chunks(2)
        .map(|c| Vec2::new(c[0], c[1]))
        .collect())
}

/// Parse a `transform` attribute into a single affine map
pub fn parse_transform(text: &str) -> Result<Affine2, ProfileError> {
    let mut transform = Affine2::IDENTITY;
    let mut rest = text.trim();
    while !rest.is_empty() {
        let (open, close) = match (rest.find('('), rest.find(')')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => return Err(ProfileError::Svg(format!("malformed transform '{}'", text))),
        };
        let name = rest[..open].trim_matches(|c: char| c.is_ascii_whitespace() || c == ',');
        let args = Tokenizer::new(&rest[open + 1..close]).numbers()?;

        let step = match (name, args.as_slice()) {
            ("matrix", &[a, b, c, d, e, f]) => Affine2::from_cols_array(&[a, b, c, d, e, f]),
            ("translate", &[x]) => Affine2::from_translation(Vec2::new(x, 0.0)),
            ("translate", &[x, y]) => Affine2::from_translation(Vec2::new(x, y)),
            ("scale", &[s]) => Affine2::from_scale(Vec2::splat(s)),
            ("scale", &[x, y]) => Affine2::from_scale(Vec2::new(x, y)),
            ("rotate", &[angle]) => Affine2::from_angle(angle.to_radians()),
            ("rotate", &[angle, x, y]) => {
                let pivot = Vec2::new(x, y);
                Affine2::from_translation(pivot)
                    * Affine2::from_angle(angle.to_radians())
                    * Affine2::from_translation(-pivot)
            }
            ("skewX", &[angle]) => {
                Affine2::from_cols_array(&[1.0, 0.0, angle.to_radians().tan(), 1.0, 0.0, 0.0])
            }
            ("skewY", &[angle]) => {
                Affine2::from_cols_array(&[1.0, angle.to_radians().tan(), 0.0, 1.0, 0.0, 0.0])
            }
            _ => {
                return Err(ProfileError::Svg(format!(
                    "unsupported transform '{}'",
                    &rest[..=close]
                )));
            }
        };
        transform = transform * step;
        rest = rest[close + 1..].trim_start();
    }
    Ok(transform)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f32),
}

struct Tokenizer<'a> {
    chars: Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            text,
        }
    }

    fn numbers(self) -> Result<Vec<f32>, ProfileError> {
        self.map(|t| match t? {
            Token::Number(n) => Ok(n),
            Token::Command(c) => Err(ProfileError::Svg(format!("unexpected '{}'", c))),
        })
        .collect()
    }

    fn number(&mut self, start: usize) -> Result<Token, ProfileError> {
        let mut end = start;
        let mut seen_dot = false;
        let mut seen_exp = false;
        let mut first = true;
        while let Some(&(i, c)) = self.chars.peek() {
            let accept = match c {
                '0'..='9' => true,
                '+' | '-' => {
                    first || self.text[..i].ends_with(['e', 'E'])
                }
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    true
                }
                'e' | 'E' if !seen_exp && !first => {
                    seen_exp = true;
                    true
                }
                _ => false,
            };
            if !accept {
                break;
            }
            first = false;
            end = i + c.len_utf8();
            self.chars.next();
        }
        self.text[start..end]
            .parse()
            .map(Token::Number)
            .map_err(|_| ProfileError::Svg(format!("invalid number '{}'", &self.text[start..end])))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, ProfileError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&(i, c)) = self.chars.peek() {
            match c {
                c if c.is_ascii_whitespace() || c == ',' => {
                    self.chars.next();
                }
                '0'..='9' | '.' | '+' | '-' => return Some(self.number(i)),
                c if c.is_ascii_alphabetic() => {
                    self.chars.next();
                    return Some(Ok(Token::Command(c)));
                }
                c => {
                    self.chars.next();
                    return Some(Err(ProfileError::Svg(format!("unexpected '{}'", c))));
                }
            }
        }
        None
    }
}

fn cubic(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, out: &mut Vec<Vec2>) {
    for i in 1..=CURVE_SEGMENTS {
        let t = i as f32 / CURVE_SEGMENTS as f32;
        let u = 1.0 - t;
        out.push(p0 * u * u * u + p1 * 3.0 * u * u * t + p2 * 3.0 * u * t * t + p3 * t * t * t);
    }
}

fn quadratic(p0: Vec2, p1: Vec2, p2: Vec2, out: &mut Vec<Vec2>) {
    for i in 1..=CURVE_SEGMENTS {
        let t = i as f32 / CURVE_SEGMENTS as f32;
        let u = 1.0 - t;
        out.push(p0 * u * u + p1 * 2.0 * u * t + p2 * t * t);
    }
}

/// Elliptical arc from `from` to `to`, converted to center form
fn arc(
    from: Vec2,
    radii: Vec2,
    x_rotation: f32,
    large_arc: bool,
    sweep: bool,
    to: Vec2,
    out: &mut Vec<Vec2>,
) {
    if from == to {
        return;
    }
    let mut radii = radii.abs();
    if radii.x == 0.0 || radii.y == 0.0 {
        out.push(to);
        return;
    }

    let rotation = Mat2::from_angle(x_rotation.to_radians());
    let p = rotation.transpose() * ((from - to) / 2.0);
    // Radii too small to reach are scaled up just enough
    let reach = (p / radii).length_squared();
    if reach > 1.0 {
        radii *= reach.sqrt();
    }

    let (rx2, ry2) = (radii.x * radii.x, radii.y * radii.y);
    let (px2, py2) = (p.x * p.x, p.y * p.y);
    let mut k = ((rx2 * ry2 - rx2 * py2 - ry2 * px2) / (rx2 * py2 + ry2 * px2))
        .max(0.0)
        .sqrt();
    if large_arc == sweep {
        k = -k;
    }
    let center_local = Vec2::new(k * radii.x * p.y / radii.y, -k * radii.y * p.x / radii.x);
    let center = rotation * center_local + (from + to) / 2.0;

    let u = (p - center_local) / radii;
    let v = (-p - center_local) / radii;
    let start = u.y.atan2(u.x);
    let mut delta = u.perp_dot(v).atan2(u.dot(v));
    if sweep && delta < 0.0 {
        delta += TAU;
    } else if !sweep && delta > 0.0 {
        delta -= TAU;
    }

    let segments = ((delta.abs() / TAU) * ELLIPSE_SEGMENTS as f32).ceil().max(1.0) as usize;
    for i in 1..segments {
        let t = start + delta * i as f32 / segments as f32;
        out.push(center + rotation * (radii * Vec2::new(t.cos(), t.sin())));
    }
    out.push(to);
}

fn take(tokens: &mut Peekable<IntoIter<Token>>) -> Result<f32, ProfileError> {
    match tokens.next() {
        Some(Token::Number(n)) => Ok(n),
        other => Err(ProfileError::Svg(format!(
            "expected a number, found {:?}",
            other
        ))),
    }
}

/// Flatten the first subpath of SVG path data into points
pub fn parse_path_data(d: &str) -> Result<Vec<Vec2>, ProfileError> {
    let tokens = Tokenizer::new(d).collect::<Result<Vec<_>, _>>()?;
    let mut tokens = tokens.into_iter().peekable();

    let mut points: Vec<Vec2> = Vec::new();
    let mut current = Vec2::ZERO;
    let mut start = Vec2::ZERO;
    let mut command: Option<char> = None;
    // Second control point of the previous curve, for S/T reflection
    let mut last_control: Option<Vec2> = None;

    loop {
        match tokens.peek() {
            None => break,
            Some(Token::Command(c)) => {
                let c = *c;
                tokens.next();
                if matches!(c, 'Z' | 'z') {
                    if !points.is_empty() {
                        break;
                    }
                    current = start;
                    command = None;
                    continue;
                }
                if matches!(c, 'M' | 'm') && !points.is_empty() {
                    // Only the first subpath is used
                    break;
                }
                command = Some(c);
            }
            Some(Token::Number(_)) => {}
        }

        let Some(c) = command else {
            return Err(ProfileError::Svg("path data must start with a command".into()));
        };
        let relative = c.is_ascii_lowercase();
        let base = if relative { current } else { Vec2::ZERO };

        let mut control = None;
        match c.to_ascii_uppercase() {
            'M' => {
                current = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                start = current;
                points.push(current);
                // Further coordinate pairs are implicit line-tos
                command = Some(if relative { 'l' } else { 'L' });
            }
            'L' => {
                current = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                points.push(current);
            }
            'H' => {
                let x = take(&mut tokens)?;
                current.x = if relative { current.x + x } else { x };
                points.push(current);
            }
            'V' => {
                let y = take(&mut tokens)?;
                current.y = if relative { current.y + y } else { y };
                points.push(current);
            }
            'C' | 'S' => {
                let c1 = if c.eq_ignore_ascii_case(&'C') {
                    base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?)
                } else {
                    last_control.map_or(current, |p| current * 2.0 - p)
                };
                let c2 = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                let end = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                cubic(current, c1, c2, end, &mut points);
                control = Some(c2);
                current = end;
            }
            'Q' | 'T' => {
                let c1 = if c.eq_ignore_ascii_case(&'Q') {
                    base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?)
                } else {
                    last_control.map_or(current, |p| current * 2.0 - p)
                };
                let end = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                quadratic(current, c1, end, &mut points);
                control = Some(c1);
                current = end;
            }
            'A' => {
                let radii = Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                let x_rotation = take(&mut tokens)?;
                let large_arc = take(&mut tokens)? != 0.0;
                let sweep = take(&mut tokens)? != 0.0;
                let end = base + Vec2::new(take(&mut tokens)?, take(&mut tokens)?);
                arc(current, radii, x_rotation, large_arc, sweep, end, &mut points);
                current = end;
            }
            other => {
                return Err(ProfileError::Svg(format!(
                    "unsupported path command '{}'",
                    other
                )));
            }
        }
        last_control = control;
    }

    Ok(points)
}
