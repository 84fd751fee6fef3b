use crate::config::SegmenterConfig;
use crate::types::*;
use tracing::debug;

/// Detects reading columns from the X-origins of a page's runs.
pub struct ColumnSegmenter<'a> {
    config: &'a SegmenterConfig,
}

impl<'a> ColumnSegmenter<'a> {
    pub fn new(config: &'a SegmenterConfig) -> Self {
        Self { config }
    }

    /// Ordered, contiguous columns covering `[0, page_width)`. Never empty.
    pub fn detect_columns(&self, runs: &[TextGlyphRun], page_width: f32) -> Vec<Column> {
        let mut xs: Vec<f32> = runs
            .iter()
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| r.origin_x)
            .collect();

        if xs.is_empty() || page_width <= 0.0 {
            return vec![Column::full_width(page_width)];
        }

        xs.sort_by(|a, b| a.total_cmp(b));
        let tolerance = page_width * self.config.column_tolerance_ratio;

        // 1-D clustering: neighbours closer than the tolerance chain together
        let mut clusters: Vec<Vec<f32>> = Vec::new();
        for x in xs.iter().copied() {
            match clusters.last_mut() {
                Some(cluster) if cluster.last().is_some_and(|prev| x - prev < tolerance) => {
                    cluster.push(x)
                }
                _ => clusters.push(vec![x]),
            }
        }

        let min_size = (self.config.min_column_runs as f32)
            .max(xs.len() as f32 * self.config.min_column_share);
        let centers: Vec<f32> = clusters
            .iter()
            .filter(|c| c.len() as f32 >= min_size)
            .map(|c| c.iter().sum::<f32>() / c.len() as f32)
            .collect();

        debug!(
            "Column clustering: {} clusters, {} kept (min size {:.1})",
            clusters.len(),
            centers.len(),
            min_size
        );

        if centers.is_empty() {
            return vec![Column::full_width(page_width)];
        }

        let last = centers.len() - 1;
        centers
            .iter()
            .enumerate()
            .map(|(i, center)| Column {
                x_start: if i == 0 {
                    0.0
                } else {
                    (centers[i - 1] + center) / 2.0
                },
                x_end: if i == last {
                    page_width
                } else {
                    (center + centers[i + 1]) / 2.0
                },
            })
            .collect()
    }
}

/// Index of the column containing `x`, else the column whose centre is nearest.
pub fn assign_column(columns: &[Column], x: f32) -> usize {
    if let Some(index) = columns.iter().position(|c| c.contains(x)) {
        return index;
    }
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.center() - x).abs().total_cmp(&(b.center() - x).abs()))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_at(x: f32, y: f32) -> TextGlyphRun {
        TextGlyphRun {
            text: "text".to_string(),
            origin_x: x,
            origin_y: y,
            width: 100.0,
            height: 10.0,
            font_size: 10.0,
            font_family: "Serif".to_string(),
            page_number: 1,
        }
    }

    #[test]
    fn no_runs_gives_one_full_width_column() {
        let config = SegmenterConfig::default();
        let columns = ColumnSegmenter::new(&config).detect_columns(&[], 600.0);
        assert_eq!(columns, vec![Column { x_start: 0.0, x_end: 600.0 }]);
    }

    #[test]
    fn two_aligned_flows_become_two_columns() {
        let config = SegmenterConfig::default();
        let mut runs = Vec::new();
        for i in 0..6 {
            runs.push(run_at(50.0, 100.0 + i as f32 * 12.0));
            runs.push(run_at(350.0, 100.0 + i as f32 * 12.0));
        }

        let columns = ColumnSegmenter::new(&config).detect_columns(&runs, 600.0);

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].x_start, 0.0);
        assert_eq!(columns[0].x_end, 200.0);
        assert_eq!(columns[1].x_start, 200.0);
        assert_eq!(columns[1].x_end, 600.0);
    }

    #[test]
    fn sparse_clusters_are_discarded_as_noise() {
        let config = SegmenterConfig::default();
        let mut runs: Vec<TextGlyphRun> = (0..10).map(|i| run_at(72.0, i as f32 * 14.0)).collect();
        // A centred heading and a page number
        runs.push(run_at(250.0, 20.0));
        runs.push(run_at(500.0, 780.0));

        let columns = ColumnSegmenter::new(&config).detect_columns(&runs, 612.0);
        assert_eq!(columns, vec![Column { x_start: 0.0, x_end: 612.0 }]);
    }

    #[test]
    fn indented_first_lines_stay_in_the_same_cluster() {
        let config = SegmenterConfig::default();
        let runs: Vec<TextGlyphRun> = (0..8)
            .map(|i| run_at(if i % 4 == 0 { 92.0 } else { 72.0 }, i as f32 * 14.0))
            .collect();

        let columns = ColumnSegmenter::new(&config).detect_columns(&runs, 612.0);
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn assign_column_falls_back_to_nearest_centre() {
        let columns = vec![
            Column { x_start: 0.0, x_end: 300.0 },
            Column { x_start: 300.0, x_end: 600.0 },
        ];
        assert_eq!(assign_column(&columns, 120.0), 0);
        assert_eq!(assign_column(&columns, 420.0), 1);
        assert_eq!(assign_column(&columns, 650.0), 1);
        assert_eq!(assign_column(&columns, -10.0), 0);
    }
}
