use crate::model::*;

// ── Free slots ────────────────────────────────────────────────────

/// Free gaps of `window` once every timeline entry is taken out.
///
/// The timeline may be unsorted and may contain overlapping entries
/// (bad upstream data); both are tolerated here.
pub fn free_spans(timeline: &[OccupancyEntry], window: &Span) -> Vec<Span> {
    let mut busy: Vec<Span> = timeline
        .iter()
        .filter(|e| e.span.overlaps(window))
        .map(|e| Span::new(e.span.start.max(window.start), e.span.end.min(window.end)))
        .collect();
    busy.sort_by_key(|s| s.start);
    let busy = merge_overlapping(&busy);
    subtract_intervals(&[*window], &busy)
}

/// Merge sorted overlapping/adjacent spans into disjoint spans.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// `base` minus `to_remove`. Both sorted by start, `to_remove` disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

/// Pairs of timeline entries that overlap each other. Empty for a healthy day.
pub fn overlapping_pairs(timeline: &[OccupancyEntry]) -> Vec<(&OccupancyEntry, &OccupancyEntry)> {
    let mut pairs = Vec::new();
    for (i, a) in timeline.iter().enumerate() {
        for b in &timeline[i + 1..] {
            if a.span.overlaps(&b.span) {
                pairs.push((a, b));
            }
        }
    }
    pairs
}
