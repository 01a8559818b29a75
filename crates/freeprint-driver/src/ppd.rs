// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PPD parser.
//
// Only `*OpenUI` / `*CloseUI` option blocks are understood; everything else
// in the file is ignored.  Parsing never fails: lines that cannot be made
// sense of are logged and skipped.

use freeprint_core::{OPTION_COPIES, OPTION_ORIENTATION, OPTION_PAGE_SIZE, PpdChoice, PpdOption};
use tracing::{debug, warn};

use crate::lines::{split_lines, strip_prefix_ignore_case};

/// Display order given to every option read from a driver file.
pub const DRIVER_OPTION_ORDER: i32 = 100;

/// Marker every PPD carries near the top of the file.
pub const PPD_MAGIC: &[u8] = b"*PPD-Adobe:";

/// How many leading bytes are searched for [`PPD_MAGIC`].
const MAGIC_WINDOW: usize = 512;

/// How many lines are searched for `*NickName` / `*ModelName`.
const NAME_SCAN_LINES: usize = 200;

const MAX_COPIES: u32 = 20;

/// Parse PPD bytes into options, in file order.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn parse(bytes: &[u8]) -> Vec<PpdOption> {
    parse_str(&String::from_utf8_lossy(bytes))
}

/// Parse PPD text into options, in file order.
pub fn parse_str(text: &str) -> Vec<PpdOption> {
    let mut parser = Parser {
        lines: split_lines(text),
        pos: 0,
    };
    parser.run()
}

/// Whether a file looks like a PPD, judging by its name or its first bytes.
pub fn looks_like_ppd(file_name: &str, bytes: &[u8]) -> bool {
    if file_name.to_ascii_lowercase().ends_with(".ppd") {
        return true;
    }
    let head = &bytes[..bytes.len().min(MAGIC_WINDOW)];
    head.windows(PPD_MAGIC.len()).any(|w| w == PPD_MAGIC)
}

/// Human-readable driver name: `*NickName`, else `*ModelName`.
pub fn display_name(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut model_name = None;

    for line in split_lines(&text).into_iter().take(NAME_SCAN_LINES) {
        let line = line.trim();
        if let Some(value) = strip_prefix_ignore_case(line, "*NickName:") {
            let value = unquote(value);
            if !value.is_empty() {
                return Some(value.to_string());
            }
        } else if model_name.is_none()
            && let Some(value) = strip_prefix_ignore_case(line, "*ModelName:")
        {
            let value = unquote(value);
            if !value.is_empty() {
                model_name = Some(value.to_string());
            }
        }
    }
    model_name
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim()
}

/// The options every usable option set must carry.
pub fn synthetic_options() -> Vec<PpdOption> {
    vec![
        PpdOption {
            keyword: OPTION_PAGE_SIZE.into(),
            display_name: "Page Size".into(),
            default_choice: "Letter".into(),
            display_order: 1,
            choices: vec![
                PpdChoice::new("Letter", "Letter (8.5 x 11 in)", ""),
                PpdChoice::new("A4", "A4 (210 x 297 mm)", ""),
                PpdChoice::new("Legal", "Legal (8.5 x 14 in)", ""),
            ],
        },
        PpdOption {
            keyword: OPTION_ORIENTATION.into(),
            display_name: "Orientation".into(),
            default_choice: "Portrait".into(),
            display_order: 2,
            choices: vec![
                PpdChoice::new("Portrait", "Portrait", ""),
                PpdChoice::new("Landscape", "Landscape", ""),
            ],
        },
        PpdOption {
            keyword: OPTION_COPIES.into(),
            display_name: "Copies".into(),
            default_choice: "1".into(),
            display_order: 3,
            choices: (1..=MAX_COPIES)
                .map(|n| PpdChoice::new(n.to_string(), n.to_string(), ""))
                .collect(),
        },
    ]
}

/// Add whichever synthetic options the driver does not define itself, then
/// sort by display order.  Options with equal order keep their relative
/// position.
pub fn with_synthetic_options(mut options: Vec<PpdOption>) -> Vec<PpdOption> {
    for synthetic in synthetic_options() {
        let defined = options
            .iter()
            .any(|o| o.keyword.eq_ignore_ascii_case(&synthetic.keyword));
        if !defined {
            options.push(synthetic);
        }
    }
    options.sort_by_key(|o| o.display_order);
    options
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Vec<PpdOption> {
        let mut options: Vec<PpdOption> = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;

            let Some(header) = strip_prefix_ignore_case(line, "*OpenUI") else {
                continue;
            };
            let Some((keyword, display_name)) = parse_open_ui(header) else {
                warn!(line, "malformed *OpenUI header, skipping block");
                continue;
            };

            let option = self.parse_block(keyword, display_name);
            if option.choices.is_empty() {
                debug!(keyword = %option.keyword, "option without choices dropped");
                continue;
            }
            if options.iter().any(|o| o.keyword.eq_ignore_ascii_case(&option.keyword)) {
                warn!(keyword = %option.keyword, "duplicate option, keeping the first");
                continue;
            }
            options.push(option);
        }

        debug!(count = options.len(), "PPD parsed");
        options
    }

    /// Read one option block.  Leaves `pos` on the `*CloseUI` line (or past
    /// the end of the file).
    fn parse_block(&mut self, keyword: &str, display_name: &str) -> PpdOption {
        let default_prefix = format!("*Default{keyword}");
        let choice_prefix = format!("*{keyword}");
        let mut default_choice = String::new();
        let mut choices = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();

            if strip_prefix_ignore_case(line, "*CloseUI").is_some() {
                break;
            }

            if let Some(rest) = strip_prefix_ignore_case(line, &default_prefix) {
                default_choice = rest
                    .split_once(':')
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default();
                self.pos += 1;
            } else if let Some(rest) = strip_prefix_ignore_case(line, &choice_prefix) {
                // parse_choice advances past every line it consumes.
                match self.parse_choice(rest) {
                    Some(choice) => choices.push(choice),
                    None => {
                        warn!(option = keyword, line, "malformed choice, skipping line");
                        self.pos += 1;
                    }
                }
            } else {
                self.pos += 1;
            }
        }

        PpdOption {
            keyword: keyword.to_string(),
            display_name: display_name.to_string(),
            default_choice,
            display_order: DRIVER_OPTION_ORDER,
            choices,
        }
    }

    /// Parse a choice whose line starts at `pos`; `rest` is that line with
    /// the option keyword removed.
    fn parse_choice(&mut self, rest: &str) -> Option<PpdChoice> {
        let (head, value) = match rest.split_once(':') {
            Some((head, value)) => (head.trim(), Some(value.trim())),
            None => (rest.trim(), None),
        };
        let (keyword, display_name) = split_translation(head);
        if keyword.is_empty() {
            return None;
        }

        self.pos += 1;
        let mut code = String::new();

        if let Some(value) = value {
            match value.strip_prefix('"') {
                Some(quoted) => {
                    if let Some(complete) = quoted.strip_suffix('"') {
                        return Some(PpdChoice::new(keyword, display_name, complete.trim()));
                    }
                    code.push_str(quoted);
                }
                None if !value.is_empty() => {
                    return Some(PpdChoice::new(keyword, display_name, value));
                }
                None => {}
            }
        }

        // Quoted value continues until the next keyword line.
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            if line.starts_with('*') {
                break;
            }
            code.push(' ');
            code.push_str(line);
            self.pos += 1;
        }

        let code = code.trim();
        let code = code.strip_suffix('"').unwrap_or(code).trim();
        Some(PpdChoice::new(keyword, display_name, code))
    }
}

/// `" *PageSize/Media Size: PickOne"` → `("PageSize", "Media Size")`.
fn parse_open_ui(header: &str) -> Option<(&str, &str)> {
    let head = match header.split_once(':') {
        Some((head, _)) => head,
        None => header,
    };
    let head = head.trim();
    let head = head.strip_prefix('*').unwrap_or(head);
    let (keyword, display_name) = split_translation(head);
    (!keyword.is_empty() && !keyword.contains(char::is_whitespace)).then_some((keyword, display_name))
}

/// Split `keyword/Translation`; the translation defaults to the keyword.
fn split_translation(head: &str) -> (&str, &str) {
    match head.split_once('/') {
        Some((keyword, name)) => {
            let keyword = keyword.trim();
            let name = name.trim();
            (keyword, if name.is_empty() { keyword } else { name })
        }
        None => (head, head),
    }
}
