use chrono::NaiveDate;

use super::parity::is_upper_week;
use crate::observability;

/// Occupant attached to a matched directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub name: String,
    pub comment: Option<String>,
}

/// Parsed form of one annotation cell clause.
///
/// A one-off move-in ("из") is desugared to `ExactDates` at parse time with
/// a synthesized occupant; a move-out ("в") becomes `ExcludeOnce`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `!dd.mm.yyyy[, dd.mm.yyyy...]-name[-comment]` — occupied on the
    /// listed dates only.
    ExactDates {
        dates: Vec<NaiveDate>,
        occupant: Occupant,
    },
    /// `#[с dd.mm.yyyy] [по dd.mm.yyyy]-name[-comment]` — weekly (or
    /// bi-weekly under a parity split) series between the bounds.
    OpenRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        occupant: Occupant,
    },
    /// `*dd.mm.yyyy в NNN***` — this room is vacated on that date.
    ExcludeOnce { date: NaiveDate },
    /// `$name[-comment]` — occupied on every matching occurrence.
    AllOccurrences { occupant: Occupant },
    /// Cell split by a `---` separator: upper-week clauses above, lower-week
    /// clauses below. Only the branch matching the target date's parity is
    /// evaluated, and `OpenRange` series step by 14 days instead of 7.
    ParitySplit {
        upper: Vec<Directive>,
        lower: Vec<Directive>,
    },
}

/// Outcome of evaluating a cell's directives against one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    Free,
    Occupied(Occupant),
}

/// The empty-cell placeholder.
const PLACEHOLDER: &str = "***";

// ── Cell entry point ──────────────────────────────────────────

/// Parse one raw annotation cell into directives.
///
/// Malformed clauses degrade to "no directive" — a bad date in one line must
/// not take down the whole ingestion pass. Degradations are counted and
/// logged at debug.
pub fn parse_cell(raw: &str) -> Vec<Directive> {
    let cell = raw.trim();
    if cell.is_empty() || cell == PLACEHOLDER {
        return Vec::new();
    }

    if let Some((upper_text, lower_text)) = split_on_separator(cell) {
        return vec![Directive::ParitySplit {
            upper: parse_clauses(upper_text),
            lower: parse_clauses(lower_text),
        }];
    }

    parse_clauses(cell)
}

/// Split the cell at the first separator line (a run of 3+ dashes on its own
/// line, whitespace-tolerant). Returns (above, below) when present.
fn split_on_separator(cell: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in cell.split('\n') {
        let trimmed = line.trim();
        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
            let above = &cell[..offset];
            let below = &cell[offset + line.len()..];
            return Some((above, below.strip_prefix('\n').unwrap_or(below)));
        }
        offset += line.len() + 1;
    }
    None
}

fn parse_clauses(text: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line == PLACEHOLDER {
            continue;
        }
        let parsed = match line.as_bytes()[0] {
            b'!' => parse_exact_dates(&line[1..]),
            b'#' => parse_open_range(&line[1..]),
            b'*' => parse_move(&line[1..]),
            b'$' => parse_all_occurrences(&line[1..]),
            _ => None,
        };
        match parsed {
            Some(d) => directives.push(d),
            None => degrade(line),
        }
    }
    directives
}

fn degrade(line: &str) {
    metrics::counter!(observability::PARSE_DEGRADATIONS_TOTAL).increment(1);
    tracing::debug!("unparseable annotation clause ignored: {line:?}");
}

// ── Clause parsers ────────────────────────────────────────────

/// Dash-separated fields of a clause body, trimmed.
fn fields(body: &str) -> Vec<&str> {
    body.split('-').map(str::trim).collect()
}

/// Occupant from `fields[at..]`: name, then the rest re-joined as the
/// comment (comments may themselves contain dashes).
fn occupant_from(fields: &[&str], at: usize) -> Option<Occupant> {
    let name = fields.get(at)?.trim();
    if name.is_empty() {
        return None;
    }
    let comment = if fields.len() > at + 1 {
        Some(fields[at + 1..].join("-"))
    } else {
        None
    };
    Some(Occupant {
        name: name.to_string(),
        comment,
    })
}

/// Strict `dd.mm.yyyy` (single-digit day/month tolerated).
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok()
}

/// `!` clause: the first field must be a comma-separated date list in full.
fn parse_exact_dates(body: &str) -> Option<Directive> {
    let fields = fields(body);
    let dates: Option<Vec<NaiveDate>> = fields
        .first()?
        .split(',')
        .map(parse_date)
        .collect();
    let dates = dates?;
    if dates.is_empty() {
        return None;
    }
    let occupant = occupant_from(&fields, 1)?;
    Some(Directive::ExactDates { dates, occupant })
}

/// `#` clause: optional `с <date>` / `по <date>` bounds, then name/comment.
/// With neither bound, the clause is an unbounded weekly series and the
/// whole body is name/comment.
fn parse_open_range(body: &str) -> Option<Directive> {
    let fields = fields(body);
    let head = *fields.first()?;

    let from = scan_bound(head, "с");
    let to = scan_bound(head, "по");

    // A bound keyword with an unparseable date is a malformed clause, not an
    // unbounded one.
    if (has_bound_keyword(head, "с") && from.is_none())
        || (has_bound_keyword(head, "по") && to.is_none())
    {
        return None;
    }

    if from.is_none() && to.is_none() {
        let occupant = occupant_from(&fields, 0)?;
        return Some(Directive::OpenRange {
            from: None,
            to: None,
            occupant,
        });
    }

    let occupant = occupant_from(&fields, 1)?;
    Some(Directive::OpenRange { from, to, occupant })
}

fn has_bound_keyword(head: &str, keyword: &str) -> bool {
    head.split_whitespace().any(|tok| tok == keyword)
}

/// Date following the given bound keyword, if both are present and valid.
fn scan_bound(head: &str, keyword: &str) -> Option<NaiveDate> {
    let mut tokens = head.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == keyword {
            return parse_date(tokens.next()?);
        }
    }
    None
}

/// `*` clause: `<date> в NNN***` (vacated here) or `<date> из NNN***`
/// (moved in from NNN).
fn parse_move(body: &str) -> Option<Directive> {
    let mut tokens = body.split_whitespace();
    let date = parse_date(tokens.next()?)?;
    let keyword = tokens.next()?;
    let room = parse_move_room(tokens.next()?)?;

    match keyword {
        "в" | "В" => Some(Directive::ExcludeOnce { date }),
        "из" => Some(Directive::ExactDates {
            dates: vec![date],
            occupant: Occupant {
                name: format!("Перенос с аудитории {room}"),
                comment: None,
            },
        }),
        _ => None,
    }
}

/// Three-digit room number with the trailing `***` marker.
fn parse_move_room(token: &str) -> Option<&str> {
    let room = token.strip_suffix("***")?;
    if room.len() == 3 && room.bytes().all(|b| b.is_ascii_digit()) {
        Some(room)
    } else {
        None
    }
}

/// `$` clause: flat name/comment for every occurrence.
fn parse_all_occurrences(body: &str) -> Option<Directive> {
    let fields = fields(body);
    let occupant = occupant_from(&fields, 0)?;
    Some(Directive::AllOccurrences { occupant })
}

// ── Evaluation ────────────────────────────────────────────────

/// Evaluate a cell's directives against one concrete date.
///
/// Clauses apply in authored order, later matches replacing earlier ones,
/// except a matching `ExcludeOnce` which forces the slot free regardless of
/// any other directive for that date.
pub fn evaluate(
    directives: &[Directive],
    date: NaiveDate,
    upper_reference: NaiveDate,
) -> SlotOutcome {
    if let [Directive::ParitySplit { upper, lower }] = directives {
        let branch = if is_upper_week(date, upper_reference) {
            upper
        } else {
            lower
        };
        // Each parity branch repeats every other week.
        return evaluate_branch(branch, date, 14);
    }
    evaluate_branch(directives, date, 7)
}

fn evaluate_branch(directives: &[Directive], date: NaiveDate, step_days: i64) -> SlotOutcome {
    let mut occupant: Option<&Occupant> = None;
    let mut excluded = false;

    for directive in directives {
        match directive {
            Directive::ExactDates { dates, occupant: o } => {
                if dates.contains(&date) {
                    occupant = Some(o);
                }
            }
            Directive::OpenRange {
                from,
                to,
                occupant: o,
            } => {
                if range_matches(*from, *to, date, step_days) {
                    occupant = Some(o);
                }
            }
            Directive::ExcludeOnce { date: d } => {
                if *d == date {
                    excluded = true;
                }
            }
            Directive::AllOccurrences { occupant: o } => {
                occupant = Some(o);
            }
            // Nested splits don't occur in the notation; skip rather than
            // recurse on garbage.
            Directive::ParitySplit { .. } => {}
        }
    }

    if excluded {
        return SlotOutcome::Free;
    }
    match occupant {
        Some(o) => SlotOutcome::Occupied(o.clone()),
        None => SlotOutcome::Free,
    }
}

/// Series membership for an open range. A `from` bound anchors the series at
/// its start; a lone `to` bound anchors it at the end, walking backwards.
fn range_matches(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    date: NaiveDate,
    step_days: i64,
) -> bool {
    match (from, to) {
        (Some(start), Some(end)) => {
            start <= date && date <= end && (date - start).num_days() % step_days == 0
        }
        (Some(start), None) => start <= date && (date - start).num_days() % step_days == 0,
        (None, Some(end)) => date <= end && (end - date).num_days() % step_days == 0,
        (None, None) => true,
    }
}
