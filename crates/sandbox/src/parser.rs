use repo_read_protocol::SearchHit;

/// Parse SeaGoat's line-oriented query output into ordered, line-ranged hits.
///
/// Each line has the form `<file>:<line>:<code>`, split on the first two
/// colons only so the code text may itself contain colons. Physically
/// contiguous lines of the same file (line number exactly one past the
/// current hit's end) are merged into a single hit; any gap or file change
/// starts a new one. Blank lines and lines whose line-number field does not
/// parse are skipped.
pub fn parse_hits(output: &str) -> Vec<SearchHit> {
    let mut results = Vec::new();
    let mut current: Option<SearchHit> = None;

    for line in output.trim().lines() {
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(line_num), Some(code)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(line_num) = line_num.parse::<usize>() else {
            continue;
        };

        match current.as_mut() {
            Some(hit) if hit.file == file && hit.end_line + 1 == line_num => {
                hit.end_line = line_num;
                hit.code.push('\n');
                hit.code.push_str(code);
            }
            _ => {
                if let Some(finished) = current.take() {
                    results.push(finished);
                }
                current = Some(SearchHit {
                    file: file.to_string(),
                    start_line: line_num,
                    end_line: line_num,
                    code: code.to_string(),
                });
            }
        }
    }

    if let Some(finished) = current {
        results.push(finished);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file: &str, start_line: usize, end_line: usize, code: &str) -> SearchHit {
        SearchHit {
            file: file.to_string(),
            start_line,
            end_line,
            code: code.to_string(),
        }
    }

    #[test]
    fn merges_contiguous_lines_of_one_file() {
        let parsed = parse_hits("a.py:1:def f():\na.py:2:    pass\n");
        assert_eq!(parsed, vec![hit("a.py", 1, 2, "def f():\n    pass")]);
    }

    #[test]
    fn line_gaps_split_hits() {
        let parsed = parse_hits("a.py:1:x\na.py:5:y\n");
        assert_eq!(parsed, vec![hit("a.py", 1, 1, "x"), hit("a.py", 5, 5, "y")]);
    }

    #[test]
    fn file_changes_split_hits_even_with_contiguous_numbers() {
        let parsed = parse_hits("a.py:1:x\nb.py:2:y\n");
        assert_eq!(parsed, vec![hit("a.py", 1, 1, "x"), hit("b.py", 2, 2, "y")]);
    }

    #[test]
    fn code_may_contain_colons() {
        let parsed = parse_hits("src/map.rs:7:let pair = key: value;\n");
        assert_eq!(
            parsed,
            vec![hit("src/map.rs", 7, 7, "let pair = key: value;")]
        );
    }

    #[test]
    fn blank_and_malformed_lines_are_skipped() {
        let raw = "\na.py:1:first\n\nnot a hit line\na.py:oops:code\na.py:2:second\n";
        let parsed = parse_hits(raw);
        assert_eq!(parsed, vec![hit("a.py", 1, 2, "first\nsecond")]);
    }

    #[test]
    fn empty_output_yields_no_hits() {
        assert!(parse_hits("").is_empty());
        assert!(parse_hits("\n\n").is_empty());
    }

    #[test]
    fn hits_preserve_first_seen_order() {
        let raw = "b.py:10:later file first\na.py:1:other\nb.py:11:back again\n";
        let parsed = parse_hits(raw);
        assert_eq!(
            parsed,
            vec![
                hit("b.py", 10, 10, "later file first"),
                hit("a.py", 1, 1, "other"),
                hit("b.py", 11, 11, "back again"),
            ]
        );
    }

    #[test]
    fn empty_code_field_is_kept() {
        let parsed = parse_hits("a.py:3:\n");
        assert_eq!(parsed, vec![hit("a.py", 3, 3, "")]);
    }
}
