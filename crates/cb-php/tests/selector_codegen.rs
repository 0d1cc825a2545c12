//! PHP rendering of selectors, list iterators and mutable-variable
//! assignments, checked against full file output.

use cb_core::{
    Assignment, File, ListIterator, PlainValue, Result, Selector, Type, Value, VarPath, Variable,
};
use cb_php::PhpBackend;
use pretty_assertions::assert_eq;

fn php() -> PhpBackend {
    PhpBackend::new()
}

fn int_struct(key: &str, value: i64) -> PlainValue {
    PlainValue::Struct(vec![(key.to_string(), PlainValue::Int(value))])
}

fn bar_struct(ints: Vec<i64>) -> PlainValue {
    PlainValue::Struct(vec![(
        "bar".to_string(),
        PlainValue::List(ints.into_iter().map(PlainValue::Int).collect()),
    )])
}

/// source: {foo: [{bar: [int]}]}
fn struct_source_var() -> Result<Variable> {
    let ty = Type::struct_of(vec![(
        "foo".to_string(),
        Type::list(Type::struct_of(vec![(
            "bar".to_string(),
            Type::list(Type::int()),
        )])),
    )]);
    let data = PlainValue::Struct(vec![(
        "foo".to_string(),
        PlainValue::List(vec![
            bar_struct(vec![1, 2]),
            bar_struct(vec![]),
            bar_struct(vec![3]),
        ]),
    )]);
    Ok(Value::container_from_plain(&data, &ty)?.assign_to_new_var())
}

const STRUCT_SOURCE_DECLARATION: &str = "$source = Array(
    'foo' => Array(
        Array(
            'bar' => Array(
                1,
                2,
            ),
        ),
        Array(
            'bar' => Array(),
        ),
        Array(
            'bar' => Array(
                3,
            ),
        ),
    ),
);
";

fn check_selector_from_struct(selector: &str, expected_code: &str) -> Result<()> {
    let file = File::new();
    let source_var = struct_source_var()?;
    file.add_var(&source_var)?;
    source_var.set_name("source")?;

    let selector = Selector::new(file.scope(), &source_var, selector)?;
    let result_var = selector.res_var()?;
    result_var.set_name("result")?;

    let expected = format!(
        "<?php\n\n{}{}\n",
        STRUCT_SOURCE_DECLARATION, expected_code
    );
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

#[test]
fn selecting_a_struct_field_needs_no_loop() -> Result<()> {
    check_selector_from_struct(".foo", "$result = $source['foo'];")
}

#[test]
fn a_trailing_list_token_is_still_a_plain_reference() -> Result<()> {
    check_selector_from_struct(".foo[]", "$result = $source['foo'];")
}

#[test]
fn collecting_a_field_of_each_item_appends_in_a_loop() -> Result<()> {
    check_selector_from_struct(
        ".foo[].bar",
        "// $tmp1;
$result = Array();

foreach ($source['foo'] as $tmp1)
    $result[] = $tmp1['bar'];",
    )
}

#[test]
fn collecting_inner_lists_merges_them_into_the_result() -> Result<()> {
    check_selector_from_struct(
        ".foo[].bar[]",
        "// $tmp1;
$result = Array();

foreach ($source['foo'] as $tmp1)
    $result = array_merge($result, $tmp1['bar']);",
    )
}

/// source: [{foo: {bar: [int]}}]
fn list_source_var() -> Result<Variable> {
    let ty = Type::list(Type::struct_of(vec![(
        "foo".to_string(),
        Type::struct_of(vec![("bar".to_string(), Type::list(Type::int()))]),
    )]));
    let data = PlainValue::List(vec![
        PlainValue::Struct(vec![("foo".to_string(), bar_struct(vec![1, 2]))]),
        PlainValue::Struct(vec![("foo".to_string(), bar_struct(vec![]))]),
        PlainValue::Struct(vec![("foo".to_string(), bar_struct(vec![3]))]),
    ]);
    Ok(Value::container_from_plain(&data, &ty)?.assign_to_new_var())
}

const LIST_SOURCE_DECLARATION: &str = "$source = Array(
    Array(
        'foo' => Array(
            'bar' => Array(
                1,
                2,
            ),
        ),
    ),
    Array(
        'foo' => Array(
            'bar' => Array(),
        ),
    ),
    Array(
        'foo' => Array(
            'bar' => Array(
                3,
            ),
        ),
    ),
);
";

fn check_selector_from_list(selector: &str, expected_code: &str) -> Result<()> {
    let file = File::new();
    let source_var = list_source_var()?;
    file.add_var(&source_var)?;
    source_var.set_name("source")?;

    let selector = Selector::new(file.scope(), &source_var, selector)?;
    let result_var = selector.res_var()?;
    result_var.set_name("result")?;

    let expected = format!("<?php\n\n{}{}\n", LIST_SOURCE_DECLARATION, expected_code);
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

#[test]
fn selecting_the_whole_list_is_a_plain_reference() -> Result<()> {
    check_selector_from_list("[]", "$result = $source;")
}

#[test]
fn selecting_a_field_of_each_list_item() -> Result<()> {
    check_selector_from_list(
        "[].foo",
        "// $tmp1;
$result = Array();

foreach ($source as $tmp1)
    $result[] = $tmp1['foo'];",
    )
}

#[test]
fn a_field_path_after_the_loop_renders_as_one_accessor_chain() -> Result<()> {
    check_selector_from_list(
        "[].foo.bar",
        "// $tmp1;
$result = Array();

foreach ($source as $tmp1)
    $result[] = $tmp1['foo']['bar'];",
    )
}

#[test]
fn merging_inner_lists_selected_from_each_item() -> Result<()> {
    check_selector_from_list(
        "[].foo.bar[]",
        "// $tmp1;
$result = Array();

foreach ($source as $tmp1)
    $result = array_merge($result, $tmp1['foo']['bar']);",
    )
}

/// source: [{foo: {bar: [{baz: [int]}]}}]
fn nested_list_source_var() -> Result<Variable> {
    let ty = Type::list(Type::struct_of(vec![(
        "foo".to_string(),
        Type::struct_of(vec![(
            "bar".to_string(),
            Type::list(Type::struct_of(vec![(
                "baz".to_string(),
                Type::list(Type::int()),
            )])),
        )]),
    )]));
    fn foo_struct(bar: PlainValue) -> PlainValue {
        PlainValue::Struct(vec![(
            "foo".to_string(),
            PlainValue::Struct(vec![("bar".to_string(), bar)]),
        )])
    }
    fn baz_struct(ints: Vec<i64>) -> PlainValue {
        PlainValue::Struct(vec![(
            "baz".to_string(),
            PlainValue::List(ints.into_iter().map(PlainValue::Int).collect()),
        )])
    }
    let data = PlainValue::List(vec![
        foo_struct(PlainValue::List(vec![
            baz_struct(vec![1, 2]),
            baz_struct(vec![3]),
        ])),
        foo_struct(PlainValue::List(vec![])),
        foo_struct(PlainValue::List(vec![baz_struct(vec![5, 6])])),
    ]);
    Ok(Value::container_from_plain(&data, &ty)?.assign_to_new_var())
}

const NESTED_LIST_SOURCE_DECLARATION: &str = "$source = Array(
    Array(
        'foo' => Array(
            'bar' => Array(
                Array(
                    'baz' => Array(
                        1,
                        2,
                    ),
                ),
                Array(
                    'baz' => Array(
                        3,
                    ),
                ),
            ),
        ),
    ),
    Array(
        'foo' => Array(
            'bar' => Array(),
        ),
    ),
    Array(
        'foo' => Array(
            'bar' => Array(
                Array(
                    'baz' => Array(
                        5,
                        6,
                    ),
                ),
            ),
        ),
    ),
);
";

fn nested_list_file(selector: &str, take_result: bool) -> Result<File> {
    let file = File::new();
    let source_var = nested_list_source_var()?;
    file.add_var(&source_var)?;
    source_var.set_name("source")?;

    let selector = Selector::new(file.scope(), &source_var, selector)?;
    if take_result {
        let result_var = selector.res_var()?;
        result_var.set_name("result")?;
    }
    Ok(file)
}

#[test]
fn two_list_tokens_nest_the_loops() -> Result<()> {
    let file = nested_list_file("[].foo.bar[].baz", true)?;
    let expected = format!(
        "<?php\n\n{}{}\n",
        NESTED_LIST_SOURCE_DECLARATION,
        "// $tmp1;
// $tmp2;
$result = Array();

foreach ($source as $tmp1)
    foreach ($tmp1['foo']['bar'] as $tmp2)
        $result[] = $tmp2['baz'];"
    );
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

#[test]
fn nested_loops_merge_when_the_selector_ends_in_a_list() -> Result<()> {
    let file = nested_list_file("[].foo.bar[].baz[]", true)?;
    let expected = format!(
        "<?php\n\n{}{}\n",
        NESTED_LIST_SOURCE_DECLARATION,
        "// $tmp1;
// $tmp2;
$result = Array();

foreach ($source as $tmp1)
    foreach ($tmp1['foo']['bar'] as $tmp2)
        $result = array_merge($result, $tmp2['baz']);"
    );
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

#[test]
fn building_the_same_graph_twice_renders_identical_output() -> Result<()> {
    let file = nested_list_file("[].foo.bar[].baz[]", true)?;
    let backend = php();
    let first = file.build(&backend)?;
    let second = file.build(&backend)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn a_selector_whose_result_is_never_taken_emits_no_code() -> Result<()> {
    let file = nested_list_file("[].foo.bar[].baz[]", false)?;
    let expected = format!("<?php\n\n{}", NESTED_LIST_SOURCE_DECLARATION);
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

#[test]
fn summing_values_with_a_mutable_accumulator() -> Result<()> {
    let file = File::new();

    let list_ty = Type::list(Type::struct_of(vec![("int".to_string(), Type::int())]));
    let data = PlainValue::List(vec![
        int_struct("int", 1),
        int_struct("int", 2),
        int_struct("int", 3),
    ]);
    let list_var = Value::container_from_plain(&data, &list_ty)?.assign_to_new_var();
    file.add_var(&list_var)?;
    list_var.set_name("list")?;

    let accumulator = Value::atomic(0i64, &Type::int())?.assign_to_new_mut_var();
    file.add_var(&accumulator)?;
    accumulator.set_name("accumulator")?;

    let iterator = ListIterator::over_var(&list_var)?;
    file.add_block(iterator.scope())?;
    let item_var = iterator.iterator_var().expect("iterator variable is set");

    let assignment = Assignment::to_var(&accumulator)?;
    assignment.set_add_value(&item_var.ref_val().value_for_key("int")?)?;
    iterator.add_mut_var_assignment(&assignment)?;

    let expected = "<?php

$list = Array(
    Array(
        'int' => 1,
    ),
    Array(
        'int' => 2,
    ),
    Array(
        'int' => 3,
    ),
);
$accumulator = 0;
// $tmp1;

foreach ($list as $tmp1)
    $accumulator += $tmp1['int'];
";
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}

/// Rewrites each struct in a list, collecting an inner list into a new field
/// through an indexed assignment back into the source list.
#[test]
fn transforming_structs_in_a_list_through_an_indexed_path() -> Result<()> {
    let file = File::new();

    let source_ty = Type::list(Type::struct_of(vec![(
        "inner".to_string(),
        Type::list(Type::struct_of(vec![("int".to_string(), Type::int())])),
    )]));
    let data = PlainValue::List(vec![
        PlainValue::Struct(vec![(
            "inner".to_string(),
            PlainValue::List(vec![int_struct("int", 1), int_struct("int", 2)]),
        )]),
        PlainValue::Struct(vec![("inner".to_string(), PlainValue::List(vec![]))]),
        PlainValue::Struct(vec![(
            "inner".to_string(),
            PlainValue::List(vec![int_struct("int", 3)]),
        )]),
    ]);
    let source_var = Value::container_from_plain(&data, &source_ty)?.assign_to_new_var();
    file.add_var(&source_var)?;
    source_var.set_name("sourceVar")?;

    let result_mut = source_var.ref_val().assign_to_new_mut_var();
    file.add_var(&result_mut)?;
    result_mut.set_name("resultMutVar")?;
    // The transformation adds a field to the item type
    result_mut
        .ty()?
        .item_type()?
        .add_field("intList", Type::list(Type::int()))?;

    let list_iterator = ListIterator::over_var(&result_mut)?;
    file.add_block(list_iterator.scope())?;
    let item_var = list_iterator
        .iterator_var()
        .expect("iterator variable is set");
    item_var.set_name("listIteratorVar")?;
    let index_var = list_iterator.get_index_var()?;
    index_var.set_name("listIteratorIndexVar")?;

    let int_list_mut = Value::empty_list(&Type::list(Type::int()))?.assign_to_new_mut_var();
    list_iterator.add_var(&int_list_mut)?;
    int_list_mut.set_name("intListMutVar")?;

    let inner_array_var = item_var.ref_val().value_for_key("inner")?.assign_to_new_var();
    list_iterator.add_var(&inner_array_var)?;
    inner_array_var.set_name("innerArrayVar")?;

    let inner_iterator = ListIterator::over_var(&inner_array_var)?;
    list_iterator.add_block(inner_iterator.scope())?;
    let inner_item_var = inner_iterator
        .iterator_var()
        .expect("iterator variable is set");
    inner_item_var.set_name("innerListIteratorVar")?;

    let append = Assignment::to_var(&int_list_mut)?;
    append.set_list_append_value(&inner_item_var.ref_val().value_for_key("int")?)?;
    inner_iterator.add_mut_var_assignment(&append)?;

    let target = VarPath::new(
        &result_mut,
        &[index_var.ref_val().into(), "intList".into()],
    )?;
    let write_back = Assignment::to_path(target)?;
    write_back.set_assign_value(&int_list_mut.ref_val())?;
    list_iterator.add_mut_var_assignment(&write_back)?;

    let expected = "<?php

$sourceVar = Array(
    Array(
        'inner' => Array(
            Array(
                'int' => 1,
            ),
            Array(
                'int' => 2,
            ),
        ),
    ),
    Array(
        'inner' => Array(),
    ),
    Array(
        'inner' => Array(
            Array(
                'int' => 3,
            ),
        ),
    ),
);
$resultMutVar = $sourceVar;
// $listIteratorVar;
// $listIteratorIndexVar;
// $intListMutVar;
// $innerArrayVar;
// $innerListIteratorVar;

foreach ($resultMutVar as $listIteratorIndexVar => $listIteratorVar)
{
    $intListMutVar = Array();
    $innerArrayVar = $listIteratorVar['inner'];

    foreach ($innerArrayVar as $innerListIteratorVar)
        $intListMutVar[] = $innerListIteratorVar['int'];

    $resultMutVar[$listIteratorIndexVar]['intList'] = $intListMutVar;
}
";
    assert_eq!(file.build(&php())?, expected);
    Ok(())
}
