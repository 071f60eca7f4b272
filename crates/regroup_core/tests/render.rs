use pretty_assertions::assert_eq;
use regroup_core::{
    clean_lines, escape_group_tag, parse_groups, render_flat, render_reclassified, Channel,
    CleanOptions, FlatOptions, GroupMap, ParseOptions, Taxonomy, UNCATEGORIZED,
};

fn groups(entries: &[(&str, &[(&str, &str)])]) -> GroupMap {
    entries
        .iter()
        .map(|(group, channels)| {
            (
                group.to_string(),
                channels
                    .iter()
                    .map(|(name, url)| Channel::new(*name, *url))
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn flat_output_tags_each_channel_with_its_group() {
    let map = groups(&[
        ("News", &[("CNN", "http://a/1"), ("BBC", "http://b/2")]),
        ("Sports", &[("ESPN", "http://c/3")]),
    ]);
    assert_eq!(
        render_flat(&map, &FlatOptions::default()),
        "CNN,http://a/1$News\nBBC,http://b/2$News\nESPN,http://c/3$Sports\n"
    );
}

#[test]
fn flat_output_escapes_separators_in_group_tag() {
    assert_eq!(escape_group_tag("A,B$C"), "A，B＄C");
    let map = groups(&[("Mix,ed$", &[("X", "http://x/1")])]);
    assert_eq!(
        render_flat(&map, &FlatOptions::default()),
        "X,http://x/1$Mix，ed＄\n"
    );
}

#[test]
fn flat_dedupe_keeps_first_occurrence() {
    let map = groups(&[
        ("One", &[("CNN", "http://a/1"), ("CNN", "http://a/1")]),
        ("Two", &[("CNN", "http://a/1"), ("CNN", "http://a/2")]),
    ]);
    assert_eq!(
        render_flat(&map, &FlatOptions { dedupe: true }),
        "CNN,http://a/1$One\nCNN,http://a/2$Two\n"
    );
    assert_eq!(render_flat(&map, &FlatOptions::default()).lines().count(), 4);
}

#[test]
fn empty_map_renders_nothing() {
    assert_eq!(render_flat(&GroupMap::new(), &FlatOptions::default()), "");
    assert_eq!(
        render_reclassified(&GroupMap::new(), Taxonomy::builtin(), None),
        ""
    );
}

#[test]
fn taxonomy_resolves_canonical_alias_and_fallback() {
    let taxonomy = Taxonomy::builtin();
    assert_eq!(taxonomy.category_for("CCTV1"), "央视频道");
    assert_eq!(taxonomy.category_for("CCTV-1综合"), "央视频道");
    assert_eq!(taxonomy.category_for("上海卫视"), "卫视频道");
    assert_eq!(taxonomy.category_for("Some Local TV"), UNCATEGORIZED);
    assert_eq!(taxonomy.canonical_name("TVB翡翠台"), Some("翡翠台"));
    assert_eq!(taxonomy.display_order().last().map(String::as_str), Some(UNCATEGORIZED));
}

#[test]
fn custom_taxonomy_keeps_table_order() {
    let taxonomy = Taxonomy::from_tables(
        &[("Kids", &["Cartoon"]), ("News", &["CNN"])],
        &[("CNN", &["CNN International"])],
    );
    let order: Vec<&str> = taxonomy.display_order().iter().map(String::as_str).collect();
    assert_eq!(order, vec!["Kids", "News", UNCATEGORIZED]);
    assert_eq!(taxonomy.category_for("CNN International"), "News");
}

#[test]
fn reclassified_output_follows_display_order_and_skips_empty_categories() {
    let taxonomy = Taxonomy::from_tables(
        &[("Kids", &["Cartoon"]), ("News", &["CNN", "BBC"]), ("Sports", &["ESPN"])],
        &[("BBC", &["BBC World"])],
    );
    let map = groups(&[
        ("Beijing", &[("BBC World", "http://b/1"), ("Local", "http://l/1")]),
        ("Shanghai", &[("CNN", "http://c/1"), ("Cartoon", "http://k/1")]),
    ]);

    let rendered = render_reclassified(&map, &taxonomy, Some("2026-01-01T00:00:00Z"));
    let expected = format!(
        "# generated at 2026-01-01T00:00:00Z\n\
         \n\
         Kids,#genre#\n\
         Cartoon,http://k/1$Shanghai\n\
         \n\
         News,#genre#\n\
         BBC World,http://b/1$Beijing\n\
         CNN,http://c/1$Shanghai\n\
         \n\
         {UNCATEGORIZED},#genre#\n\
         Local,http://l/1$Beijing\n"
    );
    assert_eq!(rendered, expected);
}

#[test]
fn reclassified_without_timestamp_starts_with_first_category() {
    let taxonomy = Taxonomy::from_tables(&[("News", &["CNN"])], &[]);
    let map = groups(&[("G", &[("CNN", "http://c/1")])]);
    assert_eq!(
        render_reclassified(&map, &taxonomy, None),
        "News,#genre#\nCNN,http://c/1$G\n"
    );
}

#[test]
fn cleaned_and_parsed_list_renders_flat() {
    let raw = "header1\nheader2\nNews,#genre#\nCNN,http://a/1\nBBC,http://b/2\nSports,#genre#\nESPN,http://c/3\n";
    let lines = clean_lines(raw, &CleanOptions::default());
    let map = parse_groups(&lines, &ParseOptions::default());
    assert_eq!(
        render_flat(&map, &FlatOptions::default()),
        "CNN,http://a/1$News\nBBC,http://b/2$News\nESPN,http://c/3$Sports\n"
    );
}
