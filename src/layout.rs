use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    N,
    H,
    W,
    C,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::N, Axis::H, Axis::W, Axis::C];

    /// Index of this axis in a freshly decoded, batch-expanded image.
    pub fn native_index(self) -> usize {
        match self {
            Axis::N => 0,
            Axis::H => 1,
            Axis::W => 2,
            Axis::C => 3,
        }
    }

    pub fn from_letter(letter: &str) -> Result<Self> {
        match letter.trim().to_ascii_lowercase().as_str() {
            "n" => Ok(Axis::N),
            "h" => Ok(Axis::H),
            "w" => Ok(Axis::W),
            "c" => Ok(Axis::C),
            _ => Err(Error::UnknownAxis(letter.to_string())),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::N => 'n',
            Axis::H => 'h',
            Axis::W => 'w',
            Axis::C => 'c',
        }
    }
}

/// A permutation of the four tensor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LayoutRepr")]
pub struct Layout([Axis; 4]);

pub const NCHW: Layout = Layout([Axis::N, Axis::C, Axis::H, Axis::W]);
pub const NHWC: Layout = Layout([Axis::N, Axis::H, Axis::W, Axis::C]);

impl Layout {
    pub fn new(axes: [Axis; 4]) -> Result<Self> {
        let layout = Layout(axes);
        if Axis::ALL.iter().any(|a| !axes.contains(a)) {
            return Err(Error::InvalidLayout(layout.to_string()));
        }
        Ok(layout)
    }

    pub fn axes(&self) -> [Axis; 4] {
        self.0
    }

    pub fn position(&self, axis: Axis) -> usize {
        // a validated layout holds every axis exactly once
        self.0.iter().position(|a| *a == axis).unwrap_or_default()
    }

    /// Native `nhwc` axis for each output position, for `permuted_axes`.
    pub fn permutation(&self) -> [usize; 4] {
        self.0.map(Axis::native_index)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let letters: Vec<String> = s.trim().chars().map(String::from).collect();
        Layout::try_from(letters.as_slice())
    }
}

impl TryFrom<&[String]> for Layout {
    type Error = Error;

    fn try_from(letters: &[String]) -> Result<Self> {
        let axes = letters
            .iter()
            .map(|l| Axis::from_letter(l))
            .collect::<Result<Vec<_>>>()?;
        let axes: [Axis; 4] = axes
            .try_into()
            .map_err(|_| Error::InvalidLayout(letters.concat()))?;
        Layout::new(axes)
    }
}

/// Metadata files spell the layout either as `nchw` or as `[n, c, h, w]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutRepr {
    Text(String),
    Letters(Vec<String>),
}

impl TryFrom<LayoutRepr> for Layout {
    type Error = Error;

    fn try_from(repr: LayoutRepr) -> Result<Self> {
        match repr {
            LayoutRepr::Text(text) => text.parse(),
            LayoutRepr::Letters(letters) => Layout::try_from(letters.as_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nchw() {
        let layout: Layout = "nchw".parse().unwrap();
        assert_eq!(layout, NCHW);
        assert_eq!(layout.permutation(), [0, 3, 1, 2]);
        assert_eq!(layout.position(Axis::C), 1);
        assert_eq!(layout.to_string(), "nchw");
    }

    #[test]
    fn test_native_layout_is_identity() {
        assert_eq!(NHWC.permutation(), [0, 1, 2, 3]);
        assert_eq!(NHWC.position(Axis::C), 3);
    }

    #[test]
    fn test_uppercase_accepted() {
        assert_eq!("NHWC".parse::<Layout>().unwrap(), NHWC);
    }

    #[test]
    fn test_repeated_axis_rejected() {
        assert!(matches!(
            "nhhc".parse::<Layout>(),
            Err(Error::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_unknown_axis_rejected() {
        assert!(matches!(
            "nxwc".parse::<Layout>(),
            Err(Error::UnknownAxis(l)) if l == "x"
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!("nhw".parse::<Layout>(), Err(Error::InvalidLayout(_))));
        assert!(matches!(
            "nhwcn".parse::<Layout>(),
            Err(Error::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_deserialize_string_and_sequence() {
        let from_text: Layout = serde_yaml::from_str("nchw").unwrap();
        let from_seq: Layout = serde_yaml::from_str("[n, c, h, w]").unwrap();
        assert_eq!(from_text, NCHW);
        assert_eq!(from_seq, NCHW);
    }
}
