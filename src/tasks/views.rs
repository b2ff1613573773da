//! Page rendering.
//!
//! In production the main pages are minified and typeset, the site map is
//! written as `sitemap.xml` and the error page becomes a PHP document that
//! answers with status 404. In development every page, special ones
//! included, is rendered to `<stem>.html` and pretty-printed.

use std::path::Path;

use super::{display_path, stem, write_file, TaskError, TaskOutput};
use crate::build::{discover_files, BuildContext};
use crate::reload::ReloadScope;
use crate::transforms::{Chain, HtmlFormat, HtmlMinify, Prepend, Typograf};

/// Directive prepended to the production error page.
pub const NOT_FOUND_DIRECTIVE: &str =
    r#"<?php header($_SERVER['SERVER_PROTOCOL']." 404 Not Found");?>"#;

/// Output name of the production site map.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Steps applied to a rendered page.
pub fn page_chain(ctx: &BuildContext) -> Chain {
    if ctx.is_production() {
        Chain::new().then(HtmlMinify::new(ctx.browsers())).then(Typograf)
    } else {
        Chain::new().then(HtmlFormat::default()).then(Typograf)
    }
}

/// Render every page.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let config = &ctx.config().views;
    let pages = discover_files(ctx.project_root(), &config.pages)?;
    let mut output = TaskOutput::default();

    if ctx.is_production() {
        let error_page = ctx.resolve(&config.error_page);
        let site_map = ctx.resolve(&config.site_map);
        let chain = page_chain(ctx);

        for page in pages.iter().filter(|p| **p != error_page && **p != site_map) {
            let dest = ctx.out_path(format!("{}.html", stem(page)));
            render(ctx, page, &chain, &dest, &mut output)?;
        }

        if site_map.is_file() {
            render(ctx, &site_map, &Chain::new(), &ctx.out_path(SITEMAP_FILE), &mut output)?;
        }

        if error_page.is_file() {
            let chain = page_chain(ctx).then(Prepend(NOT_FOUND_DIRECTIVE.to_string()));
            let dest = ctx.out_path(format!("{}.php", stem(&error_page)));
            render(ctx, &error_page, &chain, &dest, &mut output)?;
        }
    } else {
        let chain = page_chain(ctx);
        for page in &pages {
            let dest = ctx.out_path(format!("{}.html", stem(page)));
            render(ctx, page, &chain, &dest, &mut output)?;
        }
        ctx.notify_reload(ReloadScope::Page);
    }

    Ok(output)
}

/// Render one template through `chain` into `dest`.
///
/// Render and transform errors are recorded as warnings and the page is
/// skipped; only the write itself can fail the task.
fn render(
    ctx: &BuildContext,
    template: &Path,
    chain: &Chain,
    dest: &Path,
    output: &mut TaskOutput,
) -> Result<(), TaskError> {
    let name = display_path(ctx, template);
    let locals = ctx.page_context(&stem(template));
    let pretty = !ctx.is_production();

    let html = match ctx.tools().templates.render(template, &locals, pretty) {
        Ok(html) => html,
        Err(e) => {
            output.warn(format!("{}: {}", name, e));
            return Ok(());
        }
    };
    let html = match chain.apply(html) {
        Ok(html) => html,
        Err(e) => {
            output.warn(format!("{}: {}", name, e));
            return Ok(());
        }
    };

    write_file(dest, html)?;
    output.wrote(dest.to_path_buf());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::Fixture;

    const PAGE: &str = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>#{VIEW} - \"test\"</title>\n  </head>\n  <body>\n    <p>Hash #{HASH} on #{DOMAIN}</p>\n    <p>Мы  в Москве...</p>\n  </body>\n</html>\n";

    fn project(fixture: &Fixture) {
        fixture.write("assets/views/pages/index.pug", PAGE);
        fixture.write("assets/views/pages/about.pug", PAGE);
        fixture.write("assets/views/pages/error.pug", "<html><body><h1>Not  found</h1></body></html>");
        fixture.write(
            "assets/views/pages/_site-map.pug",
            "<?xml version=\"1.0\"?>\n<urlset>\n  <loc>#{URL}</loc>\n</urlset>\n",
        );
    }

    #[test]
    fn test_production_outputs() {
        let fixture = Fixture::new();
        project(&fixture);
        let ctx = fixture.context(true);

        let output = run(&ctx).expect("views should build");

        assert_eq!(output.written.len(), 4);
        let index = fixture.read_out(&ctx, "index.html");
        assert!(!index.contains("\n    "));
        assert!(index.contains("<title>index - \"test\"</title>"));
        assert!(index.contains("Hash 17000000&nbsp;on&nbsp;example.com"));
        assert!(index.contains("Мы&nbsp;в&nbsp;Москве…"));

        let sitemap = fixture.read_out(&ctx, "sitemap.xml");
        assert_eq!(sitemap, "<?xml version=\"1.0\"?>\n<urlset>\n  <loc>https://example.com/</loc>\n</urlset>\n");

        let error = fixture.read_out(&ctx, "error.php");
        assert!(error.starts_with(NOT_FOUND_DIRECTIVE));
        assert!(error.contains("<h1>Not found</h1>"));

        assert!(!ctx.out_path("error.html").exists());
        assert!(!ctx.out_path("_site-map.html").exists());
        assert!(fixture.reload.signals().is_empty());
    }

    #[test]
    fn test_development_outputs() {
        let fixture = Fixture::new();
        project(&fixture);
        let ctx = fixture.context(false);

        let output = run(&ctx).expect("views should build");

        assert_eq!(output.written.len(), 4);
        for page in ["index.html", "about.html", "error.html", "_site-map.html"] {
            assert!(ctx.out_path(page).exists(), "{} missing", page);
        }
        assert!(!ctx.out_path("sitemap.xml").exists());
        assert!(!ctx.out_path("error.php").exists());

        let index = fixture.read_out(&ctx, "index.html");
        assert!(index.contains("\n  <head>"));
        assert!(index.ends_with('\n'));
        assert_eq!(fixture.reload.signals(), vec![ReloadScope::Page]);
    }

    #[test]
    fn test_render_error_skips_page() {
        let fixture = Fixture::new();
        project(&fixture);
        fixture.write("assets/views/pages/broken.pug", "!error");
        let ctx = fixture.context(false);

        let output = run(&ctx).expect("task should still succeed");

        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].starts_with("assets/views/pages/broken.pug: "));
        assert!(!ctx.out_path("broken.html").exists());
        assert!(ctx.out_path("index.html").exists());
    }

    #[test]
    fn test_page_chain_steps() {
        let fixture = Fixture::new();
        assert_eq!(page_chain(&fixture.context(true)).step_names(), ["html-minify", "typograf"]);
        assert_eq!(page_chain(&fixture.context(false)).step_names(), ["html-format", "typograf"]);
    }
}
