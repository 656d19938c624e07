use super::sketch::Sketch;
use super::types::{Drawing, Stroke};
use crate::config::FigureConfig;
use crate::resolve::ResolvedFigure;

pub(crate) fn draw(resolved: &ResolvedFigure, config: &FigureConfig) -> Drawing {
    let mut sketch = Sketch::new(resolved, config, &[]);
    sketch.outline(&[0, 1, 2, 3], Stroke::Solid);
    sketch.decorate();
    sketch.finish()
}
