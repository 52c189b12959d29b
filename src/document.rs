//! Standalone preview documents and `% !TEX` directive scanning.
//!
//! Generated tables and charts are fragments. To compile them on their own
//! they are wrapped in a minimal document whose preamble matches the chosen
//! engine: the DVI-based Japanese engines get `jsarticle` and `dvipdfmx`
//! driver options, everything else plain `article`. Every wrapper starts with
//! a `% !TEX <engine>` magic comment so [`TexDirectives::scan`] (and the
//! compile service) pick the same engine back up.

use crate::config::{Engine, ReturnFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static ENGINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^% *!TEX.*[^a-zA-Z](((pdf|xe|lua|u?p)?latex(-dev)?)|uplatex|platex|asy|context|(pdf|xe|lua|[ou]?p)?tex) *\r?$",
    )
    .expect("valid regex")
});

static RETURN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^% *!TEX.*[^a-zA-Z](pdfjs|pdf|log) *\r?$").expect("valid regex")
});

static BIB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^% *!TEX.*[^a-zA-Z](p?bibtex8?|biber) *\r?$").expect("valid regex")
});

static GLOSSARIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^% *!TEX.*[^a-zA-Z](makeglossaries(-light)?) *\r?$").expect("valid regex")
});

static MAKEINDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^% *!TEX.*[^a-zA-Z]makeindex( [a-z0-9.\- ]*)\r?$").expect("valid regex")
});

/// Tool directives found in a LaTeX source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TexDirectives {
    /// From a magic comment, else guessed from the packages in use.
    pub engine: Option<Engine>,
    pub return_format: Option<ReturnFormat>,
    /// `bibtex`, `pbibtex`, `bibtex8`, `biber`…
    pub bibcmd: Option<String>,
    /// `makeglossaries` or `makeglossaries-light`.
    pub makeglossaries: Option<String>,
    /// Arguments of each `% !TEX makeindex …` line.
    pub makeindex: Vec<String>,
}

impl TexDirectives {
    pub fn scan(source: &str) -> Self {
        let first = |re: &Regex| {
            re.captures(source)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_lowercase())
        };

        let engine = first(&ENGINE_RE)
            .and_then(|name| Engine::from_str(&name).ok())
            .or_else(|| engine_from_content(source));
        let return_format = first(&RETURN_RE).and_then(|r| ReturnFormat::from_str(&r).ok());

        Self {
            engine,
            return_format,
            bibcmd: first(&BIB_RE),
            makeglossaries: first(&GLOSSARIES_RE),
            makeindex: MAKEINDEX_RE
                .captures_iter(source)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .collect(),
        }
    }
}

/// Guess an engine from the packages a document loads.
fn engine_from_content(source: &str) -> Option<Engine> {
    if source.contains("\\usepackage{lua") || source.contains("\\directlua") {
        Some(Engine::LuaLatex)
    } else if source.contains("fontspec") {
        Some(Engine::XeLatex)
    } else if source.contains("pstricks") {
        Some(Engine::Latex)
    } else {
        None
    }
}

/// Full document around a `tabular`.
pub fn wrap_table(tex: &str, engine: &Engine) -> String {
    let mut doc = preamble_head(engine);
    doc.push_str("\\usepackage{amsmath,amssymb,amsfonts}\n");
    doc.push_str("\\usepackage{graphicx}\n");
    doc.push_str("\\usepackage{booktabs}\n");
    doc.push_str("\\usepackage{float}\n");
    doc.push_str("\\usepackage{xcolor}\n");
    doc.push_str(&driver_package("hyperref", engine));
    doc.push_str(&driver_package("geometry", engine));
    doc.push_str("\\geometry{a4paper,margin=25mm}\n");
    push_body(&mut doc, tex);
    doc
}

/// Full document around a `tikzpicture` or `figure`.
pub fn wrap_figure(tikz: &str, engine: &Engine) -> String {
    let mut doc = preamble_head(engine);
    doc.push_str("\\usepackage{amsmath,amssymb}\n");
    doc.push_str("\\usepackage{tikz}\n");
    doc.push_str("\\usepackage{pgfplots}\n");
    doc.push_str("\\usepackage{float}\n");
    doc.push_str("\\usepackage{xcolor}\n");
    doc.push_str(&driver_package("geometry", engine));
    doc.push_str("\\geometry{a4paper,margin=25mm}\n");
    doc.push_str("\\pgfplotsset{compat=1.18}\n");
    push_body(&mut doc, tikz);
    doc
}

fn preamble_head(engine: &Engine) -> String {
    let class = match engine {
        Engine::UpLatex => "\\documentclass[uplatex,a4paper,12pt]{jsarticle}",
        Engine::PLatex => "\\documentclass[a4paper,12pt]{jsarticle}",
        _ => "\\documentclass[a4paper,12pt]{article}",
    };
    format!("% !TEX {engine}\n{class}\n")
}

fn driver_package(package: &str, engine: &Engine) -> String {
    if engine.uses_dvipdfmx() {
        format!("\\usepackage[dvipdfmx]{{{package}}}\n")
    } else {
        format!("\\usepackage{{{package}}}\n")
    }
}

fn push_body(doc: &mut String, body: &str) {
    doc.push_str("\\begin{document}\n");
    doc.push_str(body.trim_end_matches('\n'));
    doc.push_str("\n\\end{document}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uplatex_table_uses_jsarticle_and_dvipdfmx() {
        let doc = wrap_table("\\begin{tabular}{c}\n\\end{tabular}\n", &Engine::UpLatex);
        assert!(doc.starts_with("% !TEX uplatex\n"));
        assert!(doc.contains("{jsarticle}"));
        assert!(doc.contains("\\usepackage[dvipdfmx]{hyperref}"));
        assert!(doc.contains("\\end{tabular}\n\\end{document}\n"));
    }

    #[test]
    fn pdflatex_figure_uses_article() {
        let doc = wrap_figure("\\begin{tikzpicture}\\end{tikzpicture}", &Engine::PdfLatex);
        assert!(doc.starts_with("% !TEX pdflatex\n"));
        assert!(doc.contains("\\documentclass[a4paper,12pt]{article}"));
        assert!(doc.contains("\\usepackage{pgfplots}"));
        assert!(doc.contains("\\pgfplotsset{compat=1.18}"));
        assert!(!doc.contains("dvipdfmx"));
    }

    #[test]
    fn wrapped_document_scans_back_to_its_engine() {
        for engine in [Engine::UpLatex, Engine::PdfLatex, Engine::LuaLatex] {
            let doc = wrap_figure("x", &engine);
            assert_eq!(TexDirectives::scan(&doc).engine, Some(engine));
        }
    }

    #[test]
    fn scan_reads_all_directives() {
        let src = "% !TEX program = xelatex\n\
                   % !TEX return pdfjs\n\
                   % !TEX bibcmd biber\n\
                   % !TEX makeglossaries\n\
                   % !TEX makeindex -s style.ist\n\
                   % !TEX makeindex foo.idx\n\
                   \\documentclass{article}\n";
        let d = TexDirectives::scan(src);
        assert_eq!(d.engine, Some(Engine::XeLatex));
        assert_eq!(d.return_format, Some(ReturnFormat::PdfJs));
        assert_eq!(d.bibcmd.as_deref(), Some("biber"));
        assert_eq!(d.makeglossaries.as_deref(), Some("makeglossaries"));
        assert_eq!(d.makeindex, vec!["-s style.ist", "foo.idx"]);
    }

    #[test]
    fn content_heuristics_apply_without_magic_comment() {
        let lua = TexDirectives::scan("\\directlua{print(1)}");
        assert_eq!(lua.engine, Some(Engine::LuaLatex));
        let xe = TexDirectives::scan("\\usepackage{fontspec}");
        assert_eq!(xe.engine, Some(Engine::XeLatex));
        let ps = TexDirectives::scan("\\usepackage{pstricks}");
        assert_eq!(ps.engine, Some(Engine::Latex));
        assert_eq!(TexDirectives::scan("plain").engine, None);
    }

    #[test]
    fn magic_comment_beats_heuristics() {
        let d = TexDirectives::scan("% !TEX lualatex\n\\usepackage{fontspec}\n");
        assert_eq!(d.engine, Some(Engine::LuaLatex));
    }
}
