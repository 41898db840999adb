use crate::record::ExtractedFields;

/// Field-wise maximum over chunk results. An empty input merges to zero.
pub fn merge<'a, I>(results: I) -> ExtractedFields
where
    I: IntoIterator<Item = &'a ExtractedFields>,
{
    results
        .into_iter()
        .fold(ExtractedFields::zero(), |acc, fields| acc.max_with(fields))
}
