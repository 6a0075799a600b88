//! Boundary expressions: "<element edge> <viewport edge>"
//!
//! `"top 85%"` means the scroll offset at which the element's top edge
//! reaches 85% of the viewport extent. On a horizontal axis `left`/`right`
//! read as `top`/`bottom`. The viewport side accepts a `+=N`/`-=N` pixel
//! adjustment (`"top bottom-=100"`).

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A point along an edge, as a fraction of its extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor(f64);

impl Anchor {
    pub const START: Anchor = Anchor(0.0);
    pub const CENTER: Anchor = Anchor(0.5);
    pub const END: Anchor = Anchor(1.0);

    pub fn fraction(&self) -> f64 {
        self.0
    }
}

impl FromStr for Anchor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" | "left" => Ok(Anchor::START),
            "center" => Ok(Anchor::CENTER),
            "bottom" | "right" => Ok(Anchor::END),
            _ => {
                let pct = s
                    .strip_suffix('%')
                    .ok_or_else(|| Error::InvalidBoundary(format!("unknown anchor '{}'", s)))?;
                let value: f64 = pct
                    .parse()
                    .map_err(|_| Error::InvalidBoundary(format!("bad percentage '{}'", s)))?;
                if !value.is_finite() {
                    return Err(Error::InvalidBoundary(format!("bad percentage '{}'", s)));
                }
                Ok(Anchor(value / 100.0))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryExpr {
    pub element: Anchor,
    pub viewport: Anchor,
    /// Pixel adjustment applied to the viewport point
    pub offset: f64,
}

impl BoundaryExpr {
    pub fn new(element: Anchor, viewport: Anchor) -> Self {
        Self {
            element,
            viewport,
            offset: 0.0,
        }
    }

    /// Scroll position at which this boundary is crossed
    ///
    /// `pos`/`size` locate the element along the axis, `extent` is the
    /// viewport size along the same axis.
    pub fn resolve(&self, pos: f64, size: f64, extent: f64) -> Result<f64> {
        let element_point = pos + self.element.fraction() * size;
        let viewport_point = self.viewport.fraction() * extent + self.offset;
        let value = element_point - viewport_point;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::Boundary(format!(
                "non-finite boundary (pos={}, size={}, extent={})",
                pos, size, extent
            )))
        }
    }
}

impl FromStr for BoundaryExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(element), Some(viewport), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidBoundary(format!(
                "expected '<element> <viewport>', got '{}'",
                s
            )));
        };

        let (viewport, offset) = if let Some(idx) = viewport.find("+=") {
            (&viewport[..idx], parse_offset(&viewport[idx + 2..], s)?)
        } else if let Some(idx) = viewport.find("-=") {
            (&viewport[..idx], -parse_offset(&viewport[idx + 2..], s)?)
        } else {
            (viewport, 0.0)
        };

        Ok(Self {
            element: element.parse()?,
            viewport: viewport.parse()?,
            offset,
        })
    }
}

fn parse_offset(raw: &str, expr: &str) -> Result<f64> {
    let raw = raw.strip_suffix("px").unwrap_or(raw);
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::InvalidBoundary(format!("bad offset in '{}'", expr)))
}

impl fmt::Display for BoundaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% {}%",
            self.element.fraction() * 100.0,
            self.viewport.fraction() * 100.0
        )?;
        if self.offset != 0.0 {
            write!(f, "{:+}px", self.offset)?;
        }
        Ok(())
    }
}

/// End of a trigger's range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryEnd {
    Expr(BoundaryExpr),
    /// Fixed scroll distance after the start
    Distance(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords_and_percent() {
        let b: BoundaryExpr = "top 85%".parse().unwrap();
        assert_eq!(b.element, Anchor::START);
        assert!((b.viewport.fraction() - 0.85).abs() < 1e-9);

        let b: BoundaryExpr = "bottom top".parse().unwrap();
        assert_eq!(b.element, Anchor::END);
        assert_eq!(b.viewport, Anchor::START);
    }

    #[test]
    fn test_parse_offsets() {
        let b: BoundaryExpr = "top bottom-=100".parse().unwrap();
        assert_eq!(b.offset, -100.0);
        let b: BoundaryExpr = "center center+=20px".parse().unwrap();
        assert_eq!(b.offset, 20.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!("top".parse::<BoundaryExpr>().is_err());
        assert!("top 85% extra".parse::<BoundaryExpr>().is_err());
        assert!("middle top".parse::<BoundaryExpr>().is_err());
        assert!("top bottom+=x".parse::<BoundaryExpr>().is_err());
    }

    #[test]
    fn test_resolve() {
        // Element at y=1000, height 400, viewport 800 tall.
        let start: BoundaryExpr = "top 85%".parse().unwrap();
        assert!((start.resolve(1000.0, 400.0, 800.0).unwrap() - 320.0).abs() < 1e-9);

        let end: BoundaryExpr = "bottom top".parse().unwrap();
        assert_eq!(end.resolve(1000.0, 400.0, 800.0).unwrap(), 1400.0);
    }

    #[test]
    fn test_resolve_rejects_nan() {
        let b: BoundaryExpr = "top top".parse().unwrap();
        assert!(matches!(b.resolve(f64::NAN, 0.0, 800.0), Err(Error::Boundary(_))));
    }
}
