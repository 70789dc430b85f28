//! PNG renderings for eyeballing the loaded layers against the country outline.

use std::path::Path;

use geo::{BoundingRect, MultiPolygon, Point, Rect};
use log::info;
use plotters::prelude::*;

use crate::{
    country::CountryBoundary,
    datasets::PointTable,
    error::{Error, Result},
    index::PartitionTree,
};

const SIZE: (u32, u32) = (800, 800);
const POINT_SIZE: i32 = 3;

pub struct Palette;

impl Palette {
    pub const SCHOOLS: RGBColor = RGBColor(0xe4, 0x1a, 0x1c);
    pub const CELL_SITES: RGBColor = RGBColor(0x37, 0x7e, 0xb8);
    pub const NODES: RGBColor = RGBColor(0xff, 0x7f, 0x00);
    pub const COVERAGE: RGBColor = RGBColor(0x34, 0x98, 0xdb);
    pub const DARK: RGBColor = RGBColor(0x1b, 0x1b, 0x1d);
}

fn plot_err<E: std::fmt::Debug>(e: E) -> Error {
    Error::Plot(format!("{e:?}"))
}

const INDEX_DEPTH: usize = 6;

/// Splits the table into points within the boundary and points outside it.
pub fn partition_outside(points: &PointTable, boundary: &CountryBoundary) -> (Vec<Point>, Vec<Point>) {
    let tree = PartitionTree::from_multi_polygon(&boundary.geometry, INDEX_DEPTH);
    points
        .points()
        .into_iter()
        .partition(|p| tree.contains(p, &boundary.geometry.0))
}

/// Bounds of `points` padded by half a degree, widened in longitude so the
/// padding stays roughly square on the ground.
pub fn padded_bounds(points: &[Point]) -> Option<Rect> {
    let bounds = geo::MultiPoint::new(points.to_vec()).bounding_rect()?;
    let avg_lat = (bounds.min().y + bounds.max().y) / 2.0;
    let x_buffer = 0.5 / avg_lat.to_radians().cos();
    let y_buffer = 0.5;
    Some(Rect::new(
        (bounds.min().x - x_buffer, bounds.min().y - y_buffer),
        (bounds.max().x + x_buffer, bounds.max().y + y_buffer),
    ))
}

fn rings(geometry: &MultiPolygon) -> Vec<Vec<(f64, f64)>> {
    geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| ring.coords().map(|c| (c.x, c.y)).collect())
        .collect()
}

enum Layer<'a> {
    Points {
        points: &'a [Point],
        color: RGBColor,
        legend: Option<&'a str>,
    },
    Coverage(&'a MultiPolygon),
}

struct MapStyle {
    background: RGBColor,
    outline: RGBColor,
}

const LIGHT_MAP: MapStyle = MapStyle {
    background: WHITE,
    outline: BLACK,
};

const DARK_MAP: MapStyle = MapStyle {
    background: Palette::DARK,
    outline: RGBColor(0x99, 0x99, 0x99),
};

fn draw_map(
    path: &Path,
    title: &str,
    view: Rect,
    style: MapStyle,
    boundary: &CountryBoundary,
    layer: Layer,
    label: &str,
) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&style.background).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font().color(&style.outline))
        .margin(20)
        .build_cartesian_2d(view.min().x..view.max().x, view.min().y..view.max().y)
        .map_err(plot_err)?;

    chart
        .draw_series(
            rings(&boundary.geometry)
                .into_iter()
                .map(|ring| PathElement::new(ring, style.outline.stroke_width(1))),
        )
        .map_err(plot_err)?;

    match layer {
        Layer::Points { points, color, legend } => {
            let series = chart
                .draw_series(
                    points
                        .iter()
                        .map(|p| Circle::new((p.x(), p.y()), POINT_SIZE, color.mix(0.7).filled())),
                )
                .map_err(plot_err)?;
            if let Some(legend) = legend {
                series
                    .label(legend)
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(plot_err)?;
            }
        }
        Layer::Coverage(coverage) => {
            chart
                .draw_series(coverage.0.iter().map(|polygon| {
                    let ring: Vec<(f64, f64)> = polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
                    plotters::element::Polygon::new(ring, Palette::COVERAGE.mix(0.3).filled())
                }))
                .map_err(plot_err)?;
            chart
                .draw_series(
                    rings(coverage)
                        .into_iter()
                        .map(|ring| PathElement::new(ring, WHITE.mix(0.5).stroke_width(1))),
                )
                .map_err(plot_err)?;
        }
    }

    root.draw(&Rectangle::new([(10, 760), (260, 790)], WHITE.mix(0.7).filled()))
        .map_err(plot_err)?;
    root.draw(&Text::new(label.to_string(), (16, 766), ("sans-serif", 16).into_font()))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;

    info!("Rendered {}", path.display());
    Ok(())
}

pub fn plot_points(
    path: &Path,
    points: &PointTable,
    boundary: &CountryBoundary,
    title: &str,
    color: RGBColor,
) -> Result<()> {
    let mut view = boundary.total_bounds()?;
    if let Some(bounds) = points.bounds() {
        view = Rect::new(
            (view.min().x.min(bounds.min().x), view.min().y.min(bounds.min().y)),
            (view.max().x.max(bounds.max().x), view.max().y.max(bounds.max().y)),
        );
    }
    let coords = points.points();
    draw_map(
        path,
        title,
        view,
        LIGHT_MAP,
        boundary,
        Layer::Points {
            points: &coords,
            color,
            legend: None,
        },
        &format!("Total Features: {}", points.len()),
    )
}

/// Renders only the points that fall outside the boundary, zoomed to them.
/// Returns how many there were.
pub fn plot_outside_points(
    path: &Path,
    points: &PointTable,
    boundary: &CountryBoundary,
    title: &str,
    color: RGBColor,
) -> Result<usize> {
    let (_, outside) = partition_outside(points, boundary);
    let view = match padded_bounds(&outside) {
        Some(view) => view,
        None => boundary.total_bounds()?,
    };
    draw_map(
        path,
        &format!("{title} - outside points: {}", outside.len()),
        view,
        LIGHT_MAP,
        boundary,
        Layer::Points {
            points: &outside,
            color,
            legend: Some("Outside"),
        },
        &format!("Total Features: {}", outside.len()),
    )?;
    Ok(outside.len())
}

pub fn plot_coverage(path: &Path, coverage: &MultiPolygon, boundary: &CountryBoundary, title: &str) -> Result<()> {
    draw_map(
        path,
        title,
        boundary.total_bounds()?,
        DARK_MAP,
        boundary,
        Layer::Coverage(coverage),
        &format!("Coverage Areas: {}", coverage.0.len()),
    )
}
