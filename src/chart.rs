use crate::data::{CumulativePoint, Error};
use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use tracing::info;

const ANNOTATE_EVERY: NonZeroUsize = match NonZeroUsize::new(30) {
    Some(every) => every,
    None => unreachable!(),
};

/// Geometry and labelling of the mileage chart. Offsets are in miles on the y axis.
#[derive(Debug, Clone)]
pub(crate) struct ChartOptions {
    pub size: (u32, u32),
    pub annotate_every: NonZeroUsize,
    /// Periodic labels sit this far under their point. Early in the year that is below zero,
    /// outside the plotted range, so those labels get clipped; that is expected.
    pub offset_below: Decimal,
    pub offset_above: Decimal,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            size: (2000, 1000),
            annotate_every: ANNOTATE_EVERY,
            offset_below: dec!(25),
            offset_above: dec!(20),
        }
    }
}

/// A value written next to the line: `text` is drawn at (`date`, `y`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Annotation {
    pub date: NaiveDate,
    pub y: Decimal,
    pub text: String,
}

/// Everything needed to draw one chart. Nothing is drawn until `render`, which owns its
/// drawing backend for the duration of the call.
#[derive(Debug)]
pub(crate) struct MileageChart<'a> {
    title: &'a str,
    points: &'a [CumulativePoint],
    options: ChartOptions,
}

impl<'a> MileageChart<'a> {
    pub fn new(title: &'a str, points: &'a [CumulativePoint], options: ChartOptions) -> Self {
        Self {
            title,
            points,
            options,
        }
    }

    /// `<dir>/<title>.png`; the title is used as is.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.png", self.title))
    }

    /// Every n-th point (counting from one) gets its total just below it, and the last point
    /// always gets its total just above it, even if it was already labelled.
    pub fn annotations(&self) -> Vec<Annotation> {
        let every = self.options.annotate_every.get();
        let mut annotations: Vec<Annotation> = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| (i + 1) % every == 0)
            .map(|(_, point)| {
                let total = point.rounded_total();
                Annotation {
                    date: point.date.date(),
                    y: total - self.options.offset_below,
                    text: total.to_string(),
                }
            })
            .collect();
        if let Some(last) = self.points.last() {
            let total = last.rounded_total();
            annotations.push(Annotation {
                date: last.date.date(),
                y: total + self.options.offset_above,
                text: total.to_string(),
            });
        }
        annotations
    }

    /// Highest y the chart must show: the final total plus room for its label.
    fn y_max(&self) -> f64 {
        let top = self
            .points
            .last()
            .map_or(Decimal::ZERO, |p| p.rounded_total());
        to_f64(top + self.options.offset_above * dec!(2)).max(1.0)
    }

    /// Draw the chart and write it as PNG into `dir`, replacing any file of the same name.
    pub fn render(&self, dir: &Path) -> Result<PathBuf, Error> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first.date.date(), last.date.date()),
            _ => return Err(Error::EmptySeries),
        };
        // a one-day series still needs a non-empty x range
        let last = if last > first {
            last
        } else {
            first.succ_opt().unwrap_or(first)
        };
        let path = self.output_path(dir);
        self.draw(&path, first..last)
            .map_err(|message| Error::Render {
                path: path.clone(),
                message,
            })?;
        info!(path = %path.display(), points = self.points.len(), "chart written");
        Ok(path)
    }

    fn draw(&self, path: &Path, days: std::ops::Range<NaiveDate>) -> Result<(), String> {
        let root = BitMapBackend::new(path, self.options.size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                self.title,
                FontDesc::new(FontFamily::SansSerif, 36.0, FontStyle::Normal),
            )
            .margin(25)
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(days.monthly(), 0.0..self.y_max())
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .x_labels(13)
            .x_label_formatter(&|d: &NaiveDate| d.format("%b").to_string())
            .y_label_formatter(&|v| format!("{:.0}", v))
            .label_style(FontDesc::new(
                FontFamily::SansSerif,
                18.0,
                FontStyle::Normal,
            ))
            .draw()
            .map_err(|e| e.to_string())?;

        chart
            .draw_series(LineSeries::new(
                self.points
                    .iter()
                    .map(|p| (p.date.date(), to_f64(p.rounded_total()))),
                &RGBColor(31, 119, 180),
            ))
            .map_err(|e| e.to_string())?;

        let label_style =
            FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal).color(&BLACK);
        chart
            .draw_series(self.annotations().into_iter().map(|a| {
                Text::new(a.text, (a.date, to_f64(a.y)), label_style.clone())
            }))
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{Annotation, ChartOptions, MileageChart};
    use crate::{
        compute::{cumulative, YearLog},
        data::{CumulativePoint, Error},
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::{
        num::NonZeroUsize,
        path::{Path, PathBuf},
    };

    /// Render into `dir`, or `None` when the machine has no usable font to draw text with.
    fn render_in(chart: &MileageChart, dir: &Path) -> Option<PathBuf> {
        match chart.render(dir) {
            Ok(path) => Some(path),
            Err(Error::Render { message, .. }) if message.to_lowercase().contains("font") => {
                eprintln!("skipping render check, no fonts: {message}");
                None
            }
            Err(e) => panic!("render failed: {e}"),
        }
    }

    /// One mile a day for `days` days of 2021.
    fn steady(days: usize) -> Vec<CumulativePoint> {
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .iter_days()
            .take(days)
            .enumerate()
            .map(|(i, day)| CumulativePoint {
                date: day.and_hms_opt(0, 0, 0).unwrap(),
                mileage: dec!(1),
                total_mileage: Decimal::from(i + 1),
            })
            .collect()
    }

    #[test]
    fn annotate_every_thirtieth_and_last() {
        let points = steady(365);
        let chart = MileageChart::new("2021 Running Mileage", &points, ChartOptions::default());
        let annotations = chart.annotations();
        assert_eq!(annotations.len(), 13);
        assert_eq!(
            annotations[0],
            Annotation {
                date: NaiveDate::from_ymd_opt(2021, 1, 30).unwrap(),
                y: dec!(5),
                text: "30".to_owned(),
            }
        );
        assert_eq!(annotations[11].text, "360");
        assert_eq!(
            annotations[12],
            Annotation {
                date: NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
                y: dec!(385),
                text: "365".to_owned(),
            }
        );
    }

    #[test]
    fn last_point_labelled_twice_on_cadence() {
        let points = steady(60);
        let chart = MileageChart::new("t", &points, ChartOptions::default());
        let texts: Vec<String> = chart.annotations().into_iter().map(|a| a.text).collect();
        assert_eq!(texts, ["30", "60", "60"]);
    }

    #[test]
    fn custom_cadence_and_rounding() {
        let mut points = steady(5);
        points[4].total_mileage = dec!(6.21371);
        let options = ChartOptions {
            annotate_every: NonZeroUsize::new(2).unwrap(),
            ..ChartOptions::default()
        };
        let chart = MileageChart::new("t", &points, options);
        let texts: Vec<String> = chart.annotations().into_iter().map(|a| a.text).collect();
        assert_eq!(texts, ["2", "4", "6.21"]);
    }

    #[test]
    fn label_every_day() {
        let points = steady(3);
        let options = ChartOptions {
            annotate_every: NonZeroUsize::MIN,
            ..ChartOptions::default()
        };
        let chart = MileageChart::new("t", &points, options);
        let texts: Vec<String> = chart.annotations().into_iter().map(|a| a.text).collect();
        assert_eq!(texts, ["1", "2", "3", "3"]);
    }

    #[test]
    fn short_series_only_labels_last() {
        let points = steady(1);
        let chart = MileageChart::new("t", &points, ChartOptions::default());
        assert_eq!(chart.annotations().len(), 1);
        assert!(MileageChart::new("t", &[], ChartOptions::default())
            .annotations()
            .is_empty());
    }

    #[test]
    fn output_path_uses_title() {
        let points = steady(1);
        let chart = MileageChart::new("2021 Running Mileage", &points, ChartOptions::default());
        assert_eq!(
            chart.output_path(Path::new("out")),
            Path::new("out/2021 Running Mileage.png")
        );
    }

    #[test]
    fn empty_series_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let chart = MileageChart::new("empty", &[], ChartOptions::default());
        assert!(matches!(chart.render(dir.path()), Err(Error::EmptySeries)));
        assert!(!dir.path().join("empty.png").exists());
    }

    #[test]
    fn render_png() {
        let dir = tempfile::tempdir().unwrap();
        let points = steady(365);
        let chart = MileageChart::new("2021 Running Mileage", &points, ChartOptions::default());
        if let Some(path) = render_in(&chart, dir.path()) {
            assert_eq!(path, dir.path().join("2021 Running Mileage.png"));
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn render_year_without_activities() {
        let dir = tempfile::tempdir().unwrap();
        let series = cumulative(&YearLog::new(2021).daily().unwrap()).unwrap();
        assert_eq!(series.len(), 365);
        let chart = MileageChart::new("flat", &series, ChartOptions::default());
        if let Some(path) = render_in(&chart, dir.path()) {
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn render_single_day() {
        let dir = tempfile::tempdir().unwrap();
        let points = steady(1);
        let chart = MileageChart::new("one day", &points, ChartOptions::default());
        if let Some(path) = render_in(&chart, dir.path()) {
            assert_eq!(path, dir.path().join("one day.png"));
            assert!(path.exists());
        }
    }

    #[test]
    fn render_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let points = steady(30);
        let chart = MileageChart::new("nowhere", &points, ChartOptions::default());
        match chart.render(&dir.path().join("missing")) {
            Err(Error::Render { path, .. }) => {
                assert_eq!(path, dir.path().join("missing").join("nowhere.png"))
            }
            other => panic!("expected a render error, got {other:?}"),
        }
    }
}
