mod tests_node_tree;
mod tests_symbol_graph;
