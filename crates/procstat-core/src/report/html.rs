//! HTML page fragments for the report document.
//!
//! Charts are drawn in the browser by dygraphs; every chart shares one draw
//! callback so zooming one chart zooms all of them.

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON string literal, safe to embed in a `<script>` block.
fn js_string(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

pub fn page_begin(title: &str, user: &str, date: &str, chart_script: &str) -> String {
    format!(
        r#"
<html><head>
<title>{title}</title>
<script type="text/javascript" src="{script}"></script>
<script>
var allCharts = [];
var inDrawCallback = false;

OnDraw = function(me, initial) {{
    if (inDrawCallback || initial) return;
    inDrawCallback = true;
    var range = me.xAxisRange();
    for (var j = 0; j < allCharts.length; j++) {{
        if (allCharts[j] == me) continue;
        allCharts[j].updateOptions({{dateWindow: range}});
    }}
    inDrawCallback = false;
}}

MakeChart = function(id, filename, options) {{
    options.width = "75%";
    options.xTicker = Dygraph.dateTicker;
    options.xValueFormatter = Dygraph.dateString_;
    options.xAxisLabelFormatter = Dygraph.dateAxisFormatter;
    options.drawCallback = OnDraw;
    allCharts.push(new Dygraph(document.getElementById(id), filename, options));
}}
</script>
</head><body>
<p>
<span style="font-size: 150%">{title}</span>
- stat report generated by {user} on {date}</p>
<table cellpadding=0 cellspacing=0 margin=0 border=0>
"#,
        title = escape_html(title),
        script = escape_html(chart_script),
        user = escape_html(user),
        date = escape_html(date),
    )
}

/// One chart row. `options_json` is embedded verbatim.
pub fn chart(id: &str, label_html: &str, file_url: &str, options_json: &str) -> String {
    format!(
        r#"
<tr>
<td valign=top width=25%>{label_html}</td>
<td id="{id}"> </td>
</tr>
<script>
MakeChart({id_js}, {file_js}, {options_json})

</script>
"#,
        id = escape_html(id),
        id_js = js_string(id),
        file_js = js_string(file_url),
    )
}

pub const SPACER: &str = r#"
<tr><td colspan=2 height=20> </td></tr>
"#;

pub const PAGE_END: &str = r#"
</table></body></html>
"#;

// ---------------------------------------------------------------------------
// Chart labels
// ---------------------------------------------------------------------------

pub fn total_cpu_label(sys: i64, user: i64) -> String {
    format!(
        r#"
<b style="font-size: 150%">Total CPU</b><br>
jiffies: <nobr>{sys} sys</nobr>, <nobr>{user} user</nobr>
"#
    )
}

pub fn context_label(switches: i64) -> String {
    format!(
        r#"
context: <nobr>{switches} switches</nobr>
"#
    )
}

pub fn faults_label(major: i64) -> String {
    format!(
        r#"
<nobr>page faults:</nobr> <nobr>{major} major</nobr>
"#
    )
}

pub fn process_cpu_label(name: &str, pid: u32, sys: i64, user: i64) -> String {
    format!(
        r#"
<span style="font-size: 150%">{name}</span> ({pid})<br>
jiffies: <nobr>{sys} sys</nobr>, <nobr>{user} user</nobr>
</div>
"#,
        name = escape_html(name),
    )
}

/// Totals are in `nBlockErasures, nPageReads, nPageWrites` order.
pub fn yaffs_label(partition: &str, totals: [i64; 3]) -> String {
    let [erased, read, written] = totals;
    format!(
        r#"
<span style="font-size: 150%">{partition}</span> (yaffs)<br>
pages: <nobr>{read} read</nobr>,
<nobr>{written} written</nobr><br>
blocks: <nobr>{erased} erased</nobr>
"#,
        partition = escape_html(partition),
    )
}
