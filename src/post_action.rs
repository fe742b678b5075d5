//! Display-element proximity selection and primary-result marking after an action (C10).

use serde::Serialize;

use crate::model::{Bounds, Element, flatten};

#[derive(Debug, Clone, Serialize)]
pub struct DisplayElement {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
}

pub const DEFAULT_MAX_DISPLAY: usize = 20;

/// Re-read result feeds this: gather `txt` elements with non-empty value, sorted by distance
/// to `target_center`, capped at `max_display`, with the tallest marked `primary` when there
/// are two or more.
pub fn collect_display(tree: &[Element], target_center: (f64, f64), max_display: usize) -> Vec<DisplayElement> {
    let flat = flatten(tree);
    let (tx, ty) = target_center;

    let mut candidates: Vec<(f64, DisplayElement)> = flat
        .into_iter()
        .filter(|e| e.is_display_text() && !e.bounds.is_zero_dimension())
        .map(|e| {
            let (cx, cy) = e.bounds.center();
            let dist = ((cx - tx).powi(2) + (cy - ty).powi(2)).sqrt();
            (
                dist,
                DisplayElement { id: e.id, title: e.title, value: e.value, bounds: e.bounds, primary: false },
            )
        })
        .collect();

    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let mut out: Vec<DisplayElement> = candidates.into_iter().take(max_display).map(|(_, d)| d).collect();

    if out.len() >= 2 {
        if let Some(idx) = out
            .iter()
            .enumerate()
            .max_by_key(|(_, d)| d.bounds.h)
            .map(|(i, _)| i)
        {
            out[idx].primary = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoleCode;

    fn txt(id: u32, value: &str, b: Bounds) -> Element {
        Element {
            id,
            role: RoleCode::Txt,
            subrole: None,
            title: None,
            value: Some(value.to_string()),
            description: None,
            bounds: b,
            focused: false,
            enabled: None,
            selected: false,
            actions: vec![],
            reference: None,
            children: vec![],
        }
    }

    #[test]
    fn marks_tallest_as_primary_when_two_or_more() {
        let tree = vec![
            txt(1, "short", Bounds { x: 0, y: 0, w: 50, h: 10 }),
            txt(2, "tall", Bounds { x: 0, y: 20, w: 50, h: 40 }),
        ];
        let display = collect_display(&tree, (0.0, 0.0), DEFAULT_MAX_DISPLAY);
        assert_eq!(display.len(), 2);
        assert!(display.iter().find(|d| d.id == 2).unwrap().primary);
        assert!(!display.iter().find(|d| d.id == 1).unwrap().primary);
    }

    #[test]
    fn single_display_element_is_never_primary() {
        let tree = vec![txt(1, "only", Bounds { x: 0, y: 0, w: 50, h: 10 })];
        let display = collect_display(&tree, (0.0, 0.0), DEFAULT_MAX_DISPLAY);
        assert_eq!(display.len(), 1);
        assert!(!display[0].primary);
    }
}
