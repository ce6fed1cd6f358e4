// ==========================================
// 集成测试公共模块
// ==========================================
// table_builder: 输入表构建器
// scenario:      常用输入场景与输出查询
// ==========================================

#![allow(dead_code)]

pub mod scenario;
pub mod table_builder;
