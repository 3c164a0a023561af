//! Splitting a page sequence into size-bounded output documents.

use crate::error::{Error, Result};
use crate::path_utils::part_file_name;
use crate::types::{OutputPlan, PageRange};

/// Computes which pages go into which output document.
///
/// # Arguments
///
/// * `total_pages` - Number of ordered entries to distribute
/// * `max_pages` - Upper bound of pages per document, at least 1
/// * `base_name` - File name of the output when no split is needed (e.g. `"output.pdf"`)
///
/// # Returns
///
/// * `Ok(OutputPlan)` - One range named `base_name` when everything fits, otherwise
///   `ceil(total_pages / max_pages)` ranges named `{stem}_part-{n}{ext}`. Empty for zero pages.
/// * `Err(Error::InvalidConfiguration)` - `max_pages` is zero
pub fn plan(total_pages: usize, max_pages: usize, base_name: &str) -> Result<OutputPlan> {
    if max_pages == 0 {
        return Err(Error::InvalidConfiguration(
            "Maximum number of pages per document must be at least 1".to_string(),
        ));
    }

    if total_pages == 0 {
        return Ok(OutputPlan::default());
    }

    if total_pages <= max_pages {
        return Ok(OutputPlan {
            ranges: vec![PageRange {
                start: 0,
                end: total_pages,
                part_number: 1,
                file_name: base_name.to_string(),
            }],
            total_pages,
        });
    }

    let part_count = total_pages.div_ceil(max_pages);
    let ranges = (0..part_count)
        .map(|index| PageRange {
            start: index * max_pages,
            end: ((index + 1) * max_pages).min(total_pages),
            part_number: index + 1,
            file_name: part_file_name(base_name, index + 1),
        })
        .collect();

    Ok(OutputPlan {
        ranges,
        total_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(plan: &OutputPlan) -> Vec<(usize, usize)> {
        plan.iter().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn test_split_into_three_parts() {
        let plan = plan(250, 100, "book.pdf").unwrap();
        assert_eq!(plan.total_parts(), 3);
        assert_eq!(bounds(&plan), vec![(0, 100), (100, 200), (200, 250)]);
        let names: Vec<&str> = plan.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["book_part-1.pdf", "book_part-2.pdf", "book_part-3.pdf"]
        );
        assert_eq!(plan.ranges[2].part_number, 3);
    }

    #[test]
    fn test_single_part_keeps_base_name() {
        let plan = plan(50, 100, "book.pdf").unwrap();
        assert_eq!(plan.total_parts(), 1);
        assert!(!plan.is_split());
        assert_eq!(bounds(&plan), vec![(0, 50)]);
        assert_eq!(plan.ranges[0].file_name, "book.pdf");
    }

    #[test]
    fn test_exact_multiple_and_boundary() {
        let plan_exact = plan(100, 100, "b.pdf").unwrap();
        assert_eq!(plan_exact.total_parts(), 1);

        let plan_over = plan(101, 100, "b.pdf").unwrap();
        assert_eq!(bounds(&plan_over), vec![(0, 100), (100, 101)]);

        let plan_even = plan(200, 50, "b.pdf").unwrap();
        assert_eq!(plan_even.total_parts(), 4);
        assert!(plan_even.iter().all(|r| r.len() == 50));
    }

    #[test]
    fn test_zero_pages_gives_empty_plan() {
        let plan = plan(0, 100, "book.pdf").unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_pages, 0);
    }

    #[test]
    fn test_zero_max_pages_is_rejected() {
        assert!(matches!(
            plan(10, 0, "book.pdf"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_ranges_cover_every_page_once() {
        for total in 1..40 {
            for max in 1..12 {
                let plan = plan(total, max, "x.pdf").unwrap();
                let covered: usize = plan.iter().map(PageRange::len).sum();
                assert_eq!(covered, total);
                assert!(plan.iter().all(|r| r.len() >= 1 && r.len() <= max));
                assert!(plan.ranges.windows(2).all(|w| w[0].end == w[1].start));
            }
        }
    }
}
