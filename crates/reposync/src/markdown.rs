//! README post-processing: absolute raw URLs for embedded images.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::repo_url::{DataSource, replace_ignore_case};

/// `![alt](target.ext suffix)` on a single line, ext one of png/gif/jpg/jpeg.
/// Captures stop at tag delimiters so each image on a line matches separately.
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]\n]*)\]\s?\(([^)\s]*?)(\.png|\.gif|\.jpg|\.jpeg)([^)\n]*)\)")
        .expect("image pattern is valid")
});

/// Rewrite image links so they resolve outside the repository page.
///
/// Relative targets are rebased onto `<web repo>/raw/<branch>/`, and any
/// `/blob/` segment becomes `/raw/`. Text outside matched image tags is
/// left as is.
#[must_use]
pub fn rewrite_relative_images(source: &DataSource, repo_api_url: &str, markdown: &str) -> String {
    let web_repo = source.web_url_from_api(repo_api_url);
    let web_repo = web_repo.trim_end_matches('/');

    IMAGE_RE
        .replace_all(markdown, |caps: &Captures<'_>| {
            let alt = &caps[1];
            let mut target = format!("{}{}", &caps[2], &caps[3]);
            let suffix = &caps[4];

            if !target.starts_with("http") {
                let relative = target.trim_start_matches("./").trim_start_matches('/');
                target = format!("{web_repo}/raw/{}/{relative}", source.raw_branch);
            }
            let target = replace_ignore_case(&target, "/blob/", "/raw/");

            tracing::trace!(image = %target, "rewrote README image");
            format!("![{alt}]({target}{suffix})")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://api.github.com/repos/o/r";

    fn rewrite(md: &str) -> String {
        rewrite_relative_images(&DataSource::default(), REPO, md)
    }

    #[test]
    fn relative_image_is_rebased_on_raw_branch() {
        assert_eq!(
            rewrite("![alt](img/logo.png)"),
            "![alt](https://github.com/o/r/raw/master/img/logo.png)"
        );
    }

    #[test]
    fn leading_dot_slash_is_dropped() {
        assert_eq!(
            rewrite("![x](./docs/shot.jpeg)"),
            "![x](https://github.com/o/r/raw/master/docs/shot.jpeg)"
        );
    }

    #[test]
    fn absolute_blob_url_is_switched_to_raw() {
        assert_eq!(
            rewrite("![b](https://github.com/o/r/blob/main/a.gif)"),
            "![b](https://github.com/o/r/raw/main/a.gif)"
        );
    }

    #[test]
    fn title_suffix_is_preserved() {
        assert_eq!(
            rewrite(r#"![s](shot.jpg "Screenshot")"#),
            r#"![s](https://github.com/o/r/raw/master/shot.jpg "Screenshot")"#
        );
    }

    #[test]
    fn non_images_and_other_extensions_are_untouched() {
        let md = "# Title\n\n[text](page.html)\n![badge](https://img.shields.io/x.svg)\n";
        assert_eq!(rewrite(md), md);
    }

    #[test]
    fn surrounding_text_is_kept() {
        let md = "intro\n![a](a.png)\noutro";
        assert_eq!(
            rewrite(md),
            "intro\n![a](https://github.com/o/r/raw/master/a.png)\noutro"
        );
    }

    #[test]
    fn every_image_on_a_line_is_rewritten() {
        assert_eq!(
            rewrite("![a](a.png) ![b](b.png)"),
            "![a](https://github.com/o/r/raw/master/a.png) \
             ![b](https://github.com/o/r/raw/master/b.png)"
        );
        assert_eq!(
            rewrite("![a](a.png) and ![b](https://cdn.example.com/b.png)"),
            "![a](https://github.com/o/r/raw/master/a.png) and ![b](https://cdn.example.com/b.png)"
        );
    }

    #[test]
    fn multi_line_image_syntax_is_left_alone() {
        let md = "![alt\n](img/logo.png)";
        assert_eq!(rewrite(md), md);
    }

    #[test]
    fn custom_branch_is_used() {
        let source = DataSource {
            raw_branch: "main".into(),
            ..DataSource::default()
        };
        assert_eq!(
            rewrite_relative_images(&source, REPO, "![a](a.png)"),
            "![a](https://github.com/o/r/raw/main/a.png)"
        );
    }
}
