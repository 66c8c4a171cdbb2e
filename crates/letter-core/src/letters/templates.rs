//! Fixed HTML letter templates
//!
//! Markers of the form `{{name}}` are replaced by the renderer. Values are
//! escaped before substitution, the schedule table is inserted as markup.

pub const OCCUPIER: &str = "{{occupier}}";
pub const ADDRESS: &str = "{{address}}";
pub const DATE: &str = "{{date}}";
pub const REFERENCE: &str = "{{reference}}";
pub const SCHEDULE: &str = "{{schedule}}";
const STYLE_MARKER: &str = "{{style}}";

const STYLE: &str = r#"<style>
body {
font-family: sans-serif;
}
h1 {
font-weight: normal;
text-align: center;
font-size: 36pt;
text-decoration: underline;
}
p {
font-size: 13pt;
}
.addr {
font-weight: bold;
padding-top: 70px;
font-size: 18px;
}
.content {
font-family: "Calibri";
}
.header {
text-decoration: underline;
}
.schedule {
border-collapse: collapse;
font-size: 13pt;
}
.schedule th, .schedule td {
border: 1px solid #000;
padding: 4px 12px;
text-align: left;
}
</style>"#;

pub const GARDEN_WASTE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{{style}}
</head>
<body>
<section>
<div class="addr">
{{occupier}}<br>
{{address}}
</div>
<br>
<br>
<br>
<br>
<div class="content">
<p>
{{date}}
</p>
<p>
Our reference: {{reference}}
</p>
<p>
Dear Sir/Madam
</p>
<p class="header">
<strong>Garden Waste Collection</strong>
</p>
<p>
Thank you for letting us know that your garden waste was not collected on
your scheduled collection day. We apologise for any inconvenience this has
caused.
</p>
<p>
Please present your garden waste, together with this letter, at the kerbside
by 7am on your next scheduled collection day and our crew will empty it. One
copy of this letter is enclosed for each garden waste subscription held at
this property; please attach one copy to each bin.
</p>
<p>
Yours faithfully
</p>
<p>
Waste and Street Scene Services
</p>
</div>
</section>
</body>
</html>
"#;

pub const RECYCLING: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{{style}}
</head>
<body>
<section>
<div class="addr">
{{occupier}}<br>
{{address}}
</div>
<br>
<br>
<br>
<br>
<div class="content">
<p>
{{date}}
</p>
<p>
Our reference: {{reference}}
</p>
<p>
Dear Sir/Madam
</p>
<p class="header">
<strong>Recycling Collection</strong>
</p>
<p>
Thank you for letting us know that your recycling was not collected on your
scheduled collection day. We apologise for any inconvenience this has caused.
</p>
<p>
A supply of recycling sacks will be delivered to your property. Please
present your recycling at the kerbside by 7am on your next scheduled
collection day and our crew will collect it along with any extra sacks.
</p>
<p>
Yours faithfully
</p>
<p>
Waste and Street Scene Services
</p>
</div>
</section>
</body>
</html>
"#;

pub const COLLECTION_CHANGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{{style}}
</head>
<body>
<section>
<div class="addr">
{{occupier}}<br>
{{address}}
</div>
<br>
<br>
<br>
<br>
<div class="content">
<p>
{{date}}
</p>
<p>
Dear Sir/Madam
</p>
<p class="header">
<strong>Waste and Recycling Collections</strong>
</p>
<p>
Earlier this month we implemented changes to our collections for waste and
recycling which meant changes for your home. Unfortunately we have identified
further amendments needed to ensure the most efficient service delivery for
our residents. This only affects a small number of properties, but it
includes your home.
<br>
Below are the details of the new fortnightly collection arrangements for your
property:
</p>
{{schedule}}
<p>
Yours faithfully
</p>
<p>
Waste and Street Scene Services
</p>
</div>
</section>
</body>
</html>
"#;

/// Replace every marker of `template` in one pass. Substituted text is never
/// scanned again, so values containing marker text stay literal. Unknown
/// markers are kept as written.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut html = String::with_capacity(template.len() + STYLE.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        html.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find("}}") else {
            break;
        };
        let marker = &tail[..end + 2];
        let value = if marker == STYLE_MARKER {
            Some(STYLE)
        } else {
            values.iter().find(|(name, _)| *name == marker).map(|(_, v)| *v)
        };
        html.push_str(value.unwrap_or(marker));
        rest = &tail[end + 2..];
    }
    if let Some(start) = rest.find("{{") {
        html.push_str(&rest[start..]);
    } else {
        html.push_str(rest);
    }

    html
}
