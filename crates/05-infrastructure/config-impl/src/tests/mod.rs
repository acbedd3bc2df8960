//! 属性构建器测试

mod property_builder_tests;
