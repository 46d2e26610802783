//! AppleScript sources for every host interaction. All host-specific syntax
//! lives here; the rest of the crate only sees [`Script`] values.

use super::ScriptKind;
use crate::config::{Dismissal, Packaging, TextSource};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Script {
    pub kind: ScriptKind,
    pub source: String,
}

impl Script {
    pub fn raw(kind: ScriptKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

/// Quote a value as an AppleScript string literal.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn posix(path: &Path) -> String {
    quote(&path.display().to_string())
}

const FRONT_DIALOG: &str = "first window whose subrole is \"AXDialog\"";

pub fn ping() -> Script {
    Script::raw(ScriptKind::Ping, "return \"pong\"")
}

pub fn is_running(app: &str) -> Script {
    Script::raw(
        ScriptKind::IsRunning,
        format!("return (application {} is running) as text", quote(app)),
    )
}

/// Activate the application and request the open without waiting for it,
/// so a modal raised during the open cannot block the bridge call.
pub fn open_document(app: &str, path: &Path) -> Script {
    let app = quote(app);
    Script::raw(
        ScriptKind::OpenDocument,
        format!(
            "tell application {app} to activate\n\
             ignoring application responses\n\
             \ttell application {app} to open (POSIX file {path})\n\
             end ignoring\n\
             return \"requested\"",
            path = posix(path),
        ),
    )
}

pub fn dialog_visible(process: &str) -> Script {
    Script::raw(
        ScriptKind::DialogVisible,
        format!(
            "tell application \"System Events\"\n\
             \tif not (exists process {p}) then return \"false\"\n\
             \ttell process {p}\n\
             \t\treturn ((count of (windows whose subrole is \"AXDialog\")) > 0) as text\n\
             \tend tell\n\
             end tell",
            p = quote(process),
        ),
    )
}

pub fn read_dialog(process: &str, source: TextSource) -> Script {
    let body = match source {
        TextSource::StaticTexts => "\t\tset AppleScript's text item delimiters to linefeed\n\
             \t\treturn (value of static texts of w) as text"
            .to_string(),
        TextSource::EntireContents => "\t\tset parts to {}\n\
             \t\trepeat with el in (entire contents of w)\n\
             \t\t\ttry\n\
             \t\t\t\tif class of el is static text then set end of parts to (value of el as text)\n\
             \t\t\tend try\n\
             \t\tend repeat\n\
             \t\tset AppleScript's text item delimiters to linefeed\n\
             \t\treturn parts as text"
            .to_string(),
        TextSource::WindowTitle => "\t\treturn (name of w) as text".to_string(),
    };
    Script::raw(
        ScriptKind::ReadDialog(source),
        format!(
            "tell application \"System Events\"\n\
             \ttell process {p}\n\
             \t\tset w to {FRONT_DIALOG}\n\
             {body}\n\
             \tend tell\n\
             end tell",
            p = quote(process),
        ),
    )
}

pub fn dismiss(process: &str, how: Dismissal) -> Script {
    let action = match how {
        Dismissal::PrimaryButton => format!(
            "click (value of attribute \"AXDefaultButton\" of ({FRONT_DIALOG}))"
        ),
        Dismissal::SecondaryButton => format!(
            "click (value of attribute \"AXCancelButton\" of ({FRONT_DIALOG}))"
        ),
        Dismissal::ConfirmKey => "key code 36".to_string(),
        Dismissal::EscapeKey => "key code 53".to_string(),
    };
    Script::raw(
        ScriptKind::Dismiss(how),
        format!(
            "tell application \"System Events\"\n\
             \ttell process {p}\n\
             \t\tset frontmost to true\n\
             \t\t{action}\n\
             \tend tell\n\
             end tell\n\
             return \"dismissed\"",
            p = quote(process),
        ),
    )
}

pub fn close_documents(app: &str) -> Script {
    Script::raw(
        ScriptKind::CloseDocuments,
        format!(
            "tell application {}\n\
             \tif (count documents) > 0 then\n\
             \t\ttell documents to close saving no\n\
             \tend if\n\
             end tell\n\
             return \"closed\"",
            quote(app),
        ),
    )
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Open `document` with interaction suppressed, package it into `dest`, and
/// close it again. Returns the package folder on stdout.
pub fn package_document(app: &str, document: &Path, dest: &Path, opts: &Packaging) -> Script {
    Script::raw(
        ScriptKind::Package,
        format!(
            "use AppleScript version \"2.7\"\n\
             use scripting additions\n\
             set destPOSIX to {dest}\n\
             set destAlias to POSIX file destPOSIX as alias\n\
             tell application {app}\n\
             \tset originalLevel to user interaction level of script preferences\n\
             \tset user interaction level of script preferences to never interact\n\
             \ttry\n\
             \t\tset myDoc to open (POSIX file {doc})\n\
             \t\ttell myDoc to package \u{00AC}\n\
             \t\t\tto destAlias \u{00AC}\n\
             \t\t\tcopying fonts {fonts} \u{00AC}\n\
             \t\t\tcopying linked graphics {links} \u{00AC}\n\
             \t\t\tcopying profiles {profiles} \u{00AC}\n\
             \t\t\tupdating graphics {update} \u{00AC}\n\
             \t\t\tincluding hidden layers {hidden} \u{00AC}\n\
             \t\t\tignore preflight errors {preflight} \u{00AC}\n\
             \t\t\tinclude idml {idml} \u{00AC}\n\
             \t\t\tinclude pdf {pdf} \u{00AC}\n\
             \t\t\tcreating report {report}\n\
             \t\tclose myDoc saving no\n\
             \t\tset user interaction level of script preferences to originalLevel\n\
             \t\treturn destPOSIX\n\
             \ton error errMsg number errNum\n\
             \t\tset user interaction level of script preferences to originalLevel\n\
             \t\terror errMsg number errNum\n\
             \tend try\n\
             end tell",
            app = quote(app),
            dest = posix(dest),
            doc = posix(document),
            fonts = yes_no(opts.copy_fonts),
            links = yes_no(opts.copy_linked_graphics),
            profiles = yes_no(opts.copy_profiles),
            update = yes_no(opts.update_graphics),
            hidden = yes_no(opts.include_hidden_layers),
            preflight = yes_no(opts.ignore_preflight_errors),
            idml = yes_no(opts.include_idml),
            pdf = yes_no(opts.include_pdf),
            report = yes_no(opts.create_report),
        ),
    )
}

/// Close every document without saving and quit.
pub fn quit(app: &str) -> Script {
    Script::raw(
        ScriptKind::Quit,
        format!(
            "if application {a} is running then\n\
             \ttell application {a}\n\
             \t\tif (count documents) > 0 then\n\
             \t\t\ttell documents to close saving no\n\
             \t\tend if\n\
             \t\tquit saving no\n\
             \tend tell\n\
             end if\n\
             return \"quit\"",
            a = quote(app),
        ),
    )
}

/// `pkill -9 -x`; an absent process is not an error.
pub fn force_kill(process: &str) -> Script {
    Script::raw(
        ScriptKind::ForceKill,
        format!(
            "do shell script \"pkill -9 -x \" & quoted form of {p} & \" || true\"\n\
             return \"killed\"",
            p = quote(process),
        ),
    )
}

pub fn font_activate(app: &str) -> Script {
    Script::raw(
        ScriptKind::FontActivate,
        format!("tell application {} to activate", quote(app)),
    )
}

pub fn font_refresh(app: &str) -> Script {
    Script::raw(
        ScriptKind::FontRefresh,
        format!(
            "tell application \"System Events\" to tell process {} to keystroke \"r\" using command down",
            quote(app)
        ),
    )
}

pub fn font_hide(app: &str) -> Script {
    Script::raw(
        ScriptKind::FontHide,
        format!(
            "tell application \"System Events\" to tell process {} to set visible to false",
            quote(app)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_backslashes_and_quotes() {
        assert_eq!(quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }

    #[test]
    fn package_script_honours_options() {
        let mut opts = Packaging::default();
        opts.include_pdf = true;
        let s = package_document(
            "Adobe InDesign 2025",
            Path::new("/p/Book.indd"),
            Path::new("/out/Book_Packaged"),
            &opts,
        );
        assert_eq!(s.kind, ScriptKind::Package);
        assert!(s.source.contains("include pdf yes"));
        assert!(s.source.contains("include idml no"));
        assert!(s.source.contains("\"/out/Book_Packaged\""));
        assert!(s.source.contains("never interact"));
    }

    #[test]
    fn open_does_not_wait_for_the_application() {
        let s = open_document("Adobe InDesign 2025", Path::new("/p/A.indd"));
        assert!(s.source.contains("ignoring application responses"));
        assert!(s.source.contains("POSIX file \"/p/A.indd\""));
    }

    #[test]
    fn force_kill_matches_exact_process_name() {
        let s = force_kill("Adobe InDesign 2025");
        assert_eq!(s.kind, ScriptKind::ForceKill);
        assert!(s.source.contains("pkill -9 -x"));
        assert!(s.source.contains("quoted form of \"Adobe InDesign 2025\""));
    }
}
