//! Info.plist generation.
//!
//! Renders the bundle manifest from a Handlebars template. The
//! `CFBundleIconFile` entry is only emitted when an icon made it into the
//! bundle.

use crate::bundler::error::Result;
use handlebars::Handlebars;
use serde::Serialize;

/// File name of the manifest inside `Contents/`.
pub const INFO_PLIST_FILE_NAME: &str = "Info.plist";

/// Reverse-DNS prefix of generated bundle identifiers.
pub const IDENTIFIER_PREFIX: &str = "com.web";

const TEMPLATE_NAME: &str = "Info.plist";

const INFO_PLIST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleDevelopmentRegion</key>
	<string>English</string>
	<key>CFBundleExecutable</key>
	<string>{{executable_name}}</string>
	<key>CFBundleIdentifier</key>
	<string>{{prefix}}.{{identifier}}</string>
	<key>CFBundleInfoDictionaryVersion</key>
	<string>6.0</string>
	<key>CFBundleName</key>
	<string>{{bundle_name}}</string>
	<key>CFBundleDisplayName</key>
	<string>{{bundle_name}}</string>
	<key>CFBundlePackageType</key>
	<string>APPL</string>
	<key>CFBundleSupportedPlatforms</key>
	<array>
		<string>MacOSX</string>
	</array>
	<key>NSHighResolutionCapable</key>
	<true/>
	<key>NSSupportsSeamlessOpening</key>
	<true/>
	<key>NSSupportsSuddenTermination</key>
	<true/>
{{#if icon_name}}
	<key>CFBundleIconFile</key>
	<string>{{icon_name}}</string>
{{/if}}
</dict>
</plist>
"#;

/// Values substituted into the manifest template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestFields {
    /// Base name of the file in `Contents/MacOS/`.
    pub executable_name: String,
    /// Identifier suffix: the bundle name with surrounding whitespace removed.
    pub identifier: String,
    /// Display name of the app.
    pub bundle_name: String,
    /// Icon file name in `Contents/Resources/`, when an icon was written.
    pub icon_name: Option<String>,
}

impl ManifestFields {
    /// Derives the identifier from `bundle_name`.
    pub fn new(
        executable_name: impl Into<String>,
        bundle_name: impl Into<String>,
        icon_name: Option<&str>,
    ) -> Self {
        let bundle_name = bundle_name.into();
        Self {
            executable_name: executable_name.into(),
            identifier: bundle_name.trim().to_string(),
            bundle_name,
            icon_name: icon_name.map(str::to_string),
        }
    }
}

#[derive(Serialize)]
struct TemplateData<'a> {
    prefix: &'static str,
    #[serde(flatten)]
    fields: &'a ManifestFields,
}

/// Escapes text for XML character data.
fn xml_escape(data: &str) -> String {
    let mut escaped = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Pre-compiled manifest template.
pub struct ManifestRenderer {
    registry: Handlebars<'static>,
}

impl ManifestRenderer {
    /// Compiles the template.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(xml_escape);
        registry.register_template_string(TEMPLATE_NAME, INFO_PLIST_TEMPLATE)?;
        Ok(Self { registry })
    }

    /// Renders the manifest as UTF-8 XML.
    pub fn render(&self, fields: &ManifestFields) -> Result<Vec<u8>> {
        let data = TemplateData {
            prefix: IDENTIFIER_PREFIX,
            fields,
        };
        let rendered = self.registry.render(TEMPLATE_NAME, &data)?;
        Ok(rendered.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(xml: &[u8]) -> plist::Dictionary {
        plist::Value::from_reader_xml(Cursor::new(xml))
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    #[test]
    fn test_render_with_icon() {
        let renderer = ManifestRenderer::new().unwrap();
        let xml = renderer
            .render(&ManifestFields::new("my-app", "My App", Some("icon.icns")))
            .unwrap();
        let dict = parse(&xml);
        assert_eq!(dict.get("CFBundleExecutable").unwrap().as_string(), Some("my-app"));
        assert_eq!(dict.get("CFBundleName").unwrap().as_string(), Some("My App"));
        assert_eq!(dict.get("CFBundleIdentifier").unwrap().as_string(), Some("com.web.My App"));
        assert_eq!(dict.get("CFBundlePackageType").unwrap().as_string(), Some("APPL"));
        assert_eq!(dict.get("CFBundleIconFile").unwrap().as_string(), Some("icon.icns"));
        assert_eq!(dict.get("NSHighResolutionCapable").unwrap().as_boolean(), Some(true));
    }

    #[test]
    fn test_render_without_icon_omits_key() {
        let renderer = ManifestRenderer::new().unwrap();
        let xml = renderer
            .render(&ManifestFields::new("app", "App", None))
            .unwrap();
        let dict = parse(&xml);
        assert!(!dict.contains_key("CFBundleIconFile"));
        assert!(!String::from_utf8(xml).unwrap().contains("CFBundleIconFile"));
    }

    #[test]
    fn test_identifier_is_trimmed_name() {
        let fields = ManifestFields::new("app", "  Spaced Name  ", None);
        assert_eq!(fields.identifier, "Spaced Name");
        assert_eq!(fields.bundle_name, "  Spaced Name  ");
    }

    #[test]
    fn test_render_escapes_markup() {
        let renderer = ManifestRenderer::new().unwrap();
        let xml = renderer
            .render(&ManifestFields::new("app", "Tom & <Jerry>", None))
            .unwrap();
        let dict = parse(&xml);
        assert_eq!(dict.get("CFBundleName").unwrap().as_string(), Some("Tom & <Jerry>"));
    }
}
