mod common;

use common::sample_pdf;
use loanex_core::{PageRange, PageSplitter, SourceDocument};

#[test]
fn splits_long_statement_into_fixed_chunks() {
    let root = tempfile::tempdir().unwrap();
    let source = SourceDocument::from_bytes("statement.pdf", sample_pdf(120));

    let set = PageSplitter::new(50)
        .with_temp_root(root.path())
        .split(&source)
        .unwrap();

    assert_eq!(
        set.page_ranges(),
        vec![
            PageRange::new(0, 50),
            PageRange::new(50, 100),
            PageRange::new(100, 120)
        ]
    );

    let counts: Vec<usize> = set
        .chunks()
        .iter()
        .map(|chunk| {
            let bytes = std::fs::read(chunk.path().unwrap()).unwrap();
            PageSplitter::page_count(&bytes).unwrap()
        })
        .collect();
    assert_eq!(counts, vec![50, 50, 20]);
    assert_eq!(counts.iter().sum::<usize>(), 120);

    drop(set);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn exact_multiple_has_no_short_tail() {
    let ranges = PageSplitter::new(25).plan_for(&sample_pdf(100)).unwrap();

    assert_eq!(ranges.len(), 4);
    assert!(ranges.iter().all(|r| r.page_count() == 25));
}

#[test]
fn single_page_chunks() {
    let root = tempfile::tempdir().unwrap();
    let source = SourceDocument::from_bytes("three.pdf", sample_pdf(3));

    let set = PageSplitter::new(1)
        .with_temp_root(root.path())
        .split(&source)
        .unwrap();

    assert_eq!(set.len(), 3);
    for (i, chunk) in set.chunks().iter().enumerate() {
        assert_eq!(chunk.index(), i);
        assert_eq!(chunk.pages(), Some(PageRange::new(i, i + 1)));
        assert!(chunk.is_temporary());
    }
}
