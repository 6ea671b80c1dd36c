//! End-to-end rendering tests for the dynamic SQL constructs

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sqlscript::{BoundSql, SqlScriptEngine, SqlScriptError};

fn render(body: &str, parameter: Value) -> Result<BoundSql, SqlScriptError> {
    SqlScriptEngine::new().render_markup(body, &parameter)
}

#[test]
fn renders_identically_for_equal_parameters() {
    let body = "<select>SELECT * FROM orders<where>\
                <if test=\"status != null\"> AND status = #{status}</if>\
                <foreach collection=\"regions\" item=\"r\" open=\" AND region IN (\" close=\")\" separator=\",\">#{r}</foreach>\
                </where> ORDER BY ${sort}</select>";
    let parameter = json!({"status": "open", "regions": ["eu", "us"], "sort": "id"});

    let first = render(body, parameter.clone()).unwrap();
    let second = render(body, parameter.clone()).unwrap();
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.parameters, second.parameters);
    assert_eq!(first.values(&parameter), second.values(&parameter));
}

#[test]
fn static_statement_is_classified_and_reused() {
    let mut engine = SqlScriptEngine::new();
    engine
        .register("ping", "<select>SELECT #{a} + #{b}</select>")
        .unwrap();
    assert!(!engine.statement("ping").unwrap().is_dynamic());

    // extraction happened once at build; every render sees the same pair
    let p1 = json!({"a": 1, "b": 2});
    let p2 = json!({"a": 10, "b": 20});
    let first = engine.render("ping", &p1).unwrap();
    let second = engine.render("ping", &p2).unwrap();
    assert_eq!(first.sql, "SELECT ? + ?");
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.parameters, second.parameters);
    assert_eq!(first.values(&p1), vec![json!(1), json!(2)]);
    assert_eq!(second.values(&p2), vec![json!(10), json!(20)]);
}

#[test]
fn trim_strips_leading_connective_and_prefixes_where() {
    let body = "<select><trim prefix=\"WHERE\" prefixOverrides=\"AND |OR \">\
                <if test=\"name != null\"> AND name = #{name}</if>\
                <if test=\"age != null\"> AND age = #{age}</if>\
                </trim></select>";
    let parameter = json!({"name": "ada", "age": 36});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "WHERE name = ? AND age = ?");
    let expressions: Vec<&str> = bound
        .parameters
        .iter()
        .map(|p| p.expression.as_str())
        .collect();
    assert_eq!(expressions, vec!["name", "age"]);
    assert_eq!(bound.values(&parameter), vec![json!("ada"), json!(36)]);
}

#[test]
fn where_with_all_branches_false_contributes_nothing() {
    let body = "<select>SELECT * FROM users<where>\
                <if test=\"name != null\"> AND name = #{name}</if>\
                <if test=\"age != null\"> AND age = #{age}</if>\
                </where></select>";
    let bound = render(body, json!({"name": null, "age": null})).unwrap();
    assert_eq!(bound.sql, "SELECT * FROM users");
    assert!(bound.parameters.is_empty());
}

#[test]
fn where_does_not_confuse_android_with_a_connective() {
    let body = "<select><where>ANDROID_ID = #{id}</where></select>";
    let bound = render(body, json!({"id": 5})).unwrap();
    assert_eq!(bound.sql, "WHERE ANDROID_ID = ?");
}

#[test]
fn foreach_joins_elements_into_placeholder_list() {
    let body = "<select>\
                <foreach collection=\"ids\" item=\"id\" open=\"(\" close=\")\" separator=\",\">#{id}</foreach>\
                </select>";
    let parameter = json!({"ids": [1, 2, 3]});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "(?,?,?)");
    assert_eq!(bound.parameters.len(), 3);
    assert_eq!(
        bound.values(&parameter),
        vec![json!(1), json!(2), json!(3)]
    );
}

#[test]
fn foreach_repeated_expression_binds_per_iteration() {
    // the same textual expression appears once per iteration; each occurrence
    // must map to its own positional binding
    let body = "<insert>INSERT INTO pairs VALUES \
                <foreach collection=\"rows\" item=\"row\" separator=\", \">(#{row.a}, #{row.b})</foreach>\
                </insert>";
    let parameter = json!({"rows": [{"a": 1, "b": 2}, {"a": 3, "b": 4}]});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "INSERT INTO pairs VALUES (?, ?), (?, ?)");
    assert_eq!(
        bound.values(&parameter),
        vec![json!(1), json!(2), json!(3), json!(4)]
    );
}

#[test]
fn foreach_null_collection_is_an_error_unless_nullable() {
    let body = "<select><foreach collection=\"ids\" item=\"id\">#{id}</foreach></select>";
    let err = render(body, json!({"ids": null})).unwrap_err();
    assert!(matches!(err, SqlScriptError::Evaluation(_)));

    let body = "<select>SELECT 1<foreach collection=\"ids\" item=\"id\" nullable=\"true\" open=\" IN (\" close=\")\">#{id}</foreach></select>";
    let bound = render(body, json!({"ids": null})).unwrap();
    assert_eq!(bound.sql, "SELECT 1");
}

#[test]
fn choose_takes_exactly_the_first_matching_branch() {
    let body = "<select><choose>\
                <when test=\"false\">X</when>\
                <when test=\"true\">A</when>\
                <when test=\"true\">B</when>\
                <otherwise>C</otherwise>\
                </choose></select>";
    let bound = render(body, json!({})).unwrap();
    assert_eq!(bound.sql, "A");
}

#[test]
fn bind_is_visible_to_later_siblings_only() {
    let body = "<select><if test=\"x == null\">unset </if>\
                <bind name=\"x\" value=\"1 + 1\"/>${x}</select>";
    let bound = render(body, json!({})).unwrap();
    assert_eq!(bound.sql, "unset 2");
}

#[test]
fn bind_feeds_like_patterns() {
    let body = "<select>SELECT * FROM users\
                <bind name=\"pattern\" value=\"'%' + name + '%'\"/> WHERE name LIKE #{pattern}</select>";
    let parameter = json!({"name": "ada"});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "SELECT * FROM users WHERE name LIKE ?");
    assert_eq!(bound.values(&parameter), vec![json!("%ada%")]);
}

#[test]
fn set_clause_drops_trailing_comma() {
    let body = "<update>UPDATE users<set>\
                <if test=\"name != null\"> name = #{name},</if>\
                <if test=\"age != null\"> age = #{age},</if>\
                </set> WHERE id = #{id}</update>";
    let parameter = json!({"name": "ada", "age": null, "id": 1});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "UPDATE usersSET name = ? WHERE id = ?");
    assert_eq!(bound.values(&parameter), vec![json!("ada"), json!(1)]);
}

#[test]
fn raw_substitution_is_inserted_verbatim() {
    let body = "<select>SELECT * FROM ${table} WHERE id = #{id}</select>";
    let parameter = json!({"table": "audit_2024", "id": 9});
    let bound = render(body, parameter.clone()).unwrap();
    assert_eq!(bound.sql, "SELECT * FROM audit_2024 WHERE id = ?");
    assert_eq!(bound.values(&parameter), vec![json!(9)]);
}

#[test]
fn escaped_markers_render_literally() {
    let body = r"<select>SELECT '\#{bound}' AS a, ${x} AS b, '\${raw}' AS c</select>";
    let bound = render(body, json!({"x": 7})).unwrap();
    assert_eq!(bound.sql, "SELECT '#{bound}' AS a, 7 AS b, '${raw}' AS c");
    assert!(bound.parameters.is_empty());
}

#[test]
fn unbalanced_placeholder_fails_the_call() {
    let body = "<select><if test=\"true\">SELECT ${oops</if></select>";
    let err = render(body, json!({"oops": 1})).unwrap_err();
    assert!(matches!(err, SqlScriptError::Evaluation(_)));
}

#[test]
fn full_query_combining_constructs() {
    let body = "<select>SELECT * FROM employees\
                <where>\
                <choose>\
                <when test=\"id != null\"> AND id = #{id}</when>\
                <when test=\"names != null\">\
                <foreach collection=\"names\" item=\"n\" open=\" AND name IN (\" close=\")\" separator=\", \">#{n}</foreach>\
                </when>\
                <otherwise> AND active = #{active}</otherwise>\
                </choose>\
                <if test=\"dept != null\"> AND dept = #{dept}</if>\
                </where></select>";

    let by_names = json!({"id": null, "names": ["li", "bo"], "dept": "eng", "active": true});
    let bound = render(body, by_names.clone()).unwrap();
    assert_eq!(
        bound.sql,
        "SELECT * FROM employeesWHERE name IN (?, ?) AND dept = ?"
    );
    assert_eq!(
        bound.values(&by_names),
        vec![json!("li"), json!("bo"), json!("eng")]
    );

    let fallback = json!({"id": null, "names": null, "dept": null, "active": false});
    let bound = render(body, fallback.clone()).unwrap();
    assert_eq!(bound.sql, "SELECT * FROM employeesWHERE active = ?");
    assert_eq!(bound.values(&fallback), vec![json!(false)]);
}
