//! Built-in core block table

/// Core block types as a TOML `[[blocks]]` table
pub const CORE_BLOCKS: &str = r##"
[[blocks]]
name = "core/paragraph"
wrapper_tag = "p"
[blocks.attributes.align]
type = "string"
[blocks.attributes.dropCap]
type = "boolean"
default = false
[blocks.attributes.placeholder]
type = "string"
[blocks.attributes.direction]
type = "string"
enum = ["ltr", "rtl"]

[[blocks]]
name = "core/heading"
[blocks.attributes.level]
type = "integer"
default = 2
[blocks.attributes.textAlign]
type = "string"
[blocks.attributes.placeholder]
type = "string"

[[blocks]]
name = "core/list"
container = true
default_child = "core/list-item"
allowed_children = ["core/list-item"]
[blocks.attributes.ordered]
type = "boolean"
default = false
[blocks.attributes.start]
type = "integer"
[blocks.attributes.reversed]
type = "boolean"
[blocks.attributes.type]
type = "string"

[[blocks]]
name = "core/list-item"
wrapper_tag = "li"
[blocks.attributes.placeholder]
type = "string"

[[blocks]]
name = "core/quote"
container = true
default_child = "core/paragraph"
[blocks.attributes.citation]
type = "string"
role = "content"
[blocks.attributes.textAlign]
type = "string"

[[blocks]]
name = "core/image"
[blocks.attributes.url]
type = "string"
role = "content"
[blocks.attributes.alt]
type = "string"
role = "content"
default = ""
[blocks.attributes.caption]
type = "string"
role = "content"
[blocks.attributes.title]
type = "string"
role = "content"
[blocks.attributes.id]
type = "integer"
[blocks.attributes.width]
type = "integer"
[blocks.attributes.height]
type = "integer"
[blocks.attributes.sizeSlug]
type = "string"
[blocks.attributes.linkDestination]
type = "string"
[blocks.attributes.align]
type = "string"
enum = ["left", "center", "right", "wide", "full"]

[[blocks]]
name = "core/code"

[[blocks]]
name = "core/preformatted"

[[blocks]]
name = "core/separator"
[blocks.attributes.opacity]
type = "string"
default = "alpha-channel"
enum = ["css", "alpha-channel"]

[[blocks]]
name = "core/table"
[blocks.attributes.hasFixedLayout]
type = "boolean"
default = false
[blocks.attributes.caption]
type = "string"
role = "content"

[[blocks]]
name = "core/group"
container = true
[blocks.attributes.tagName]
type = "string"
default = "div"
[blocks.attributes.layout]
type = "object"

[[blocks]]
name = "core/details"
container = true
default_child = "core/paragraph"
[blocks.attributes.showContent]
type = "boolean"
default = false
[blocks.attributes.summary]
type = "string"
role = "content"

[[blocks]]
name = "core/columns"
container = true
default_child = "core/column"
allowed_children = ["core/column"]
[blocks.attributes.isStackedOnMobile]
type = "boolean"
default = true
[blocks.attributes.verticalAlignment]
type = "string"

[[blocks]]
name = "core/column"
container = true
wrapper_tag = "div"
[blocks.attributes.width]
type = "string"
[blocks.attributes.verticalAlignment]
type = "string"

[[blocks]]
name = "core/buttons"
container = true
default_child = "core/button"
allowed_children = ["core/button"]
[blocks.attributes.layout]
type = "object"

[[blocks]]
name = "core/button"
wrapper_tag = "div"
[blocks.attributes.url]
type = "string"
role = "content"
[blocks.attributes.text]
type = "string"
role = "content"
[blocks.attributes.linkTarget]
type = "string"
role = "content"

[[blocks]]
name = "core/cover"
container = true
default_child = "core/paragraph"
[blocks.attributes.url]
type = "string"
role = "content"
[blocks.attributes.dimRatio]
type = "number"
default = 100
[blocks.attributes.minHeight]
type = "number"
[blocks.attributes.isDark]
type = "boolean"
default = true

[[blocks]]
name = "core/spacer"
[blocks.attributes.height]
type = "string"
default = "100px"

[[blocks]]
name = "core/html"

[[blocks]]
name = "core/freeform"
"##;
