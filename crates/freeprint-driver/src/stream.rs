// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PJL + PostScript print-stream generation.
//
// The document is rendered as plain monospaced text, one PostScript `show`
// per input line, after a setup section that injects the selected driver
// features.  The whole stream is wrapped in a PJL job so the printer resets
// before and after it.

use freeprint_core::{OPTION_COPIES, OPTION_ORIENTATION, OPTION_PAGE_SIZE, PpdOption, SelectedOptions};
use tracing::{debug, instrument};

use crate::lines::split_lines;

/// PJL Universal Exit Language sequence.
pub const UEL: &str = "\x1b%-12345X";

const FORM_FEED: char = '\x0c';

/// Produce the byte stream for one job.
///
/// Selected options are applied in a fixed order: `PageSize`, then
/// `Orientation`, then every other selected key in selection order.
/// `Copies` becomes a PJL command instead of a feature.  Selections that
/// name an unknown option or choice, or a choice without invocation code,
/// are skipped.
#[instrument(skip(driver_options, selected, document), fields(bytes = document.len()))]
pub fn generate(
    driver_options: &[PpdOption],
    selected: &SelectedOptions,
    job_name: &str,
    page_language: &str,
    document: &[u8],
) -> Vec<u8> {
    let mut ps = String::with_capacity(document.len() * 2 + 512);

    ps.push_str(UEL);
    ps.push('\n');
    line(&mut ps, &format!("@PJL JOB NAME=\"{job_name}\""));
    if let Some(copies) = selected
        .get(OPTION_COPIES)
        .and_then(|c| c.trim().parse::<i64>().ok())
        .filter(|&c| c > 1)
    {
        line(&mut ps, &format!("@PJL SET COPIES={copies}"));
    }
    line(&mut ps, &format!("@PJL ENTER LANGUAGE={page_language}"));

    line(&mut ps, "%!PS-Adobe-3.0");
    line(&mut ps, "%%EndComments");
    line(&mut ps, "");
    line(&mut ps, "%%BeginSetup");
    write_features(&mut ps, driver_options, selected);
    line(&mut ps, "%%EndSetup");
    line(&mut ps, "");

    line(&mut ps, "userdict begin /ehsave save def end");
    line(&mut ps, "%%Page: 1 1");
    line(&mut ps, "/Courier findfont 12 scalefont setfont");
    line(&mut ps, "72 720 moveto");
    write_text_body(&mut ps, document);
    line(&mut ps, "showpage");
    line(&mut ps, "ehsave restore");
    line(&mut ps, "%%EOF");

    ps.push(FORM_FEED);
    ps.push_str(UEL);
    ps.push('\n');
    line(&mut ps, "@PJL EOJ");

    let stream = to_ascii(&ps);
    debug!(len = stream.len(), "print stream generated");
    stream
}

/// `setpagedevice` code for the synthetic `PageSize` choices.  Anything
/// unrecognised falls back to Letter.
pub fn page_size_code(choice: &str) -> &'static str {
    match choice {
        "A4" => "<< /PageSize [595 842] /ImagingBBox null >> setpagedevice",
        "Legal" => "<< /PageSize [612 1008] /ImagingBBox null >> setpagedevice",
        _ => "<< /PageSize [612 792] /ImagingBBox null >> setpagedevice",
    }
}

/// `setpagedevice` code for the synthetic `Orientation` choices.
pub fn orientation_code(choice: &str) -> &'static str {
    match choice {
        "Landscape" => "<< /Orientation 1 >> setpagedevice",
        _ => "<< /Orientation 0 >> setpagedevice",
    }
}

fn line(ps: &mut String, text: &str) {
    ps.push_str(text);
    ps.push('\n');
}

fn write_features(ps: &mut String, driver_options: &[PpdOption], selected: &SelectedOptions) {
    if let Some(choice) = selected.get(OPTION_PAGE_SIZE) {
        write_feature(ps, &format!("*{OPTION_PAGE_SIZE}"), page_size_code(choice));
    }
    if let Some(choice) = selected.get(OPTION_ORIENTATION) {
        write_feature(ps, &format!("*{OPTION_ORIENTATION}"), orientation_code(choice));
    }

    for (keyword, choice_keyword) in selected {
        if [OPTION_PAGE_SIZE, OPTION_ORIENTATION, OPTION_COPIES].contains(&keyword.as_str()) {
            continue;
        }
        let Some(option) = driver_options
            .iter()
            .find(|o| o.keyword.eq_ignore_ascii_case(keyword))
        else {
            debug!(%keyword, "selected option not in driver, skipped");
            continue;
        };
        let Some(choice) = option.choice(choice_keyword) else {
            debug!(%keyword, choice = %choice_keyword, "selected choice not in driver, skipped");
            continue;
        };
        if choice.invocation_code.trim().is_empty() {
            continue;
        }
        write_feature(
            ps,
            &format!("*{} {}", option.keyword, choice.keyword),
            &choice.invocation_code,
        );
    }
}

fn write_feature(ps: &mut String, label: &str, code: &str) {
    line(ps, "featurebegin{");
    line(ps, &format!("%%BeginFeature: {label}"));
    line(ps, code);
    line(ps, "%%EndFeature");
    line(ps, "}featurecleanup");
}

fn write_text_body(ps: &mut String, document: &[u8]) {
    let text = String::from_utf8_lossy(document);
    for text_line in split_lines(&text) {
        let escaped = text_line.replace('(', "\\(").replace(')', "\\)");
        line(ps, &format!("({escaped}) show"));
        line(ps, "0 -14 rmoveto");
    }
}

/// Encode as US-ASCII; anything outside it becomes `?`.
fn to_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppd::{parse_str, with_synthetic_options};

    fn selection(pairs: &[(&str, &str)]) -> SelectedOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn generate_text(options: &[PpdOption], selected: &SelectedOptions, document: &[u8]) -> String {
        String::from_utf8(generate(options, selected, "report.txt", "POSTSCRIPT", document)).unwrap()
    }

    #[test]
    fn a4_hello_job_matches_expected_stream() {
        let options = with_synthetic_options(Vec::new());
        let selected = selection(&[("PageSize", "A4"), ("Copies", "1")]);
        let text = generate_text(&options, &selected, b"hello");

        let expected = "\x1b%-12345X\n\
@PJL JOB NAME=\"report.txt\"\n\
@PJL ENTER LANGUAGE=POSTSCRIPT\n\
%!PS-Adobe-3.0\n\
%%EndComments\n\
\n\
%%BeginSetup\n\
featurebegin{\n\
%%BeginFeature: *PageSize\n\
<< /PageSize [595 842] /ImagingBBox null >> setpagedevice\n\
%%EndFeature\n\
}featurecleanup\n\
%%EndSetup\n\
\n\
userdict begin /ehsave save def end\n\
%%Page: 1 1\n\
/Courier findfont 12 scalefont setfont\n\
72 720 moveto\n\
(hello) show\n\
0 -14 rmoveto\n\
showpage\n\
ehsave restore\n\
%%EOF\n\
\x0c\x1b%-12345X\n\
@PJL EOJ\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn copies_above_one_emit_pjl_command() {
        let options = with_synthetic_options(Vec::new());
        let text = generate_text(&options, &selection(&[("Copies", "5")]), b"");
        assert!(text.contains("@PJL SET COPIES=5\n@PJL ENTER LANGUAGE=POSTSCRIPT\n"));
        assert!(!text.contains("BeginFeature: *Copies"));

        let text = generate_text(&options, &selection(&[("Copies", "abc")]), b"");
        assert!(!text.contains("SET COPIES"));
        let text = generate_text(&options, &SelectedOptions::new(), b"");
        assert!(!text.contains("SET COPIES"));
        assert!(!text.contains("featurebegin"));
    }

    #[test]
    fn features_follow_fixed_order() {
        let ppd = "*OpenUI *Duplex: PickOne\n\
*Duplex DuplexNoTumble/Long Edge: \"<</Duplex true>>setpagedevice\"\n\
*CloseUI: *Duplex\n";
        let options = with_synthetic_options(parse_str(ppd));
        let selected = selection(&[
            ("duplex", "duplexnotumble"),
            ("Orientation", "Landscape"),
            ("PageSize", "Legal"),
        ]);
        let text = generate_text(&options, &selected, b"x");

        let page = text.find("[612 1008]").unwrap();
        let orientation = text.find("<< /Orientation 1 >> setpagedevice").unwrap();
        let duplex = text.find("%%BeginFeature: *Duplex DuplexNoTumble\n<</Duplex true>>setpagedevice\n").unwrap();
        assert!(page < orientation && orientation < duplex);
    }

    #[test]
    fn unknown_selections_are_skipped() {
        let options = with_synthetic_options(Vec::new());
        let selected = selection(&[("Stapler", "On")]);
        let text = generate_text(&options, &selected, b"x");
        assert!(!text.contains("Stapler"));
    }

    #[test]
    fn body_escapes_parens_and_keeps_trailing_line() {
        let text = generate_text(&[], &SelectedOptions::new(), b"f(x)\n");
        assert!(text.contains("(f\\(x\\)) show\n0 -14 rmoveto\n() show\n0 -14 rmoveto\nshowpage\n"));
    }

    #[test]
    fn non_ascii_becomes_question_mark() {
        let stream = generate(&[], &SelectedOptions::new(), "caf\u{e9}", "POSTSCRIPT", "\u{fc}ber".as_bytes());
        let text = String::from_utf8(stream).unwrap();
        assert!(text.contains("@PJL JOB NAME=\"caf?\""));
        assert!(text.contains("(?ber) show"));
    }

    #[test]
    fn unknown_page_size_falls_back_to_letter() {
        assert_eq!(page_size_code("Tabloid"), page_size_code("Letter"));
        assert_eq!(orientation_code("Sideways"), "<< /Orientation 0 >> setpagedevice");
    }
}
